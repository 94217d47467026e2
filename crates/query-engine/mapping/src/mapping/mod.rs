//! Naming rules between the query model and the document store.
//!
//! Translation resolves every member path and document type through a
//! [`Mapping`] before anything reaches a search request, so the rest of
//! the pipeline never sees unmapped names.

use convert_case::{Case, Casing};
use smol_str::SmolStr;

use query_engine_search::search::ast::{Criteria, FieldName, TypeName};
use query_engine_search::search::helpers::term;

/// How query-model names become document-store names.
pub trait Mapping {
    /// Resolve a dotted member path to the stored field name.
    fn field_name(&self, doc_type: &str, path: &str) -> FieldName;

    /// Resolve the document type tag used in the search URI.
    fn type_name(&self, doc_type: &str) -> TypeName;

    /// Criteria applied when a query specifies no query and no filter
    /// of its own. `None` leaves such queries unscoped.
    fn default_criteria(&self, doc_type: &str) -> Option<Criteria>;
}

/// Camel-cases every dotted path segment and the type name, which is
/// how documents indexed from camel-case-keyed JSON are stored.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultMapping;

impl Mapping for DefaultMapping {
    fn field_name(&self, _doc_type: &str, path: &str) -> FieldName {
        let mapped = path
            .split('.')
            .map(|segment| segment.to_case(Case::Camel))
            .collect::<Vec<_>>()
            .join(".");
        FieldName::new(mapped)
    }

    fn type_name(&self, doc_type: &str) -> TypeName {
        TypeName::new(doc_type.to_case(Case::Camel))
    }

    fn default_criteria(&self, _doc_type: &str) -> Option<Criteria> {
        None
    }
}

/// Lets several logical document types share one physical index: every
/// document carries a discriminator field naming its type, an optional
/// envelope prefix wraps the stored fields, and unscoped queries gain a
/// term criteria on the discriminator.
#[derive(Debug, Clone)]
pub struct DiscriminatorMapping<M> {
    inner: M,
    discriminator_field: FieldName,
    prefix: Option<SmolStr>,
}

impl<M: Mapping> DiscriminatorMapping<M> {
    pub fn new(inner: M, discriminator_field: impl Into<FieldName>) -> Self {
        DiscriminatorMapping {
            inner,
            discriminator_field: discriminator_field.into(),
            prefix: None,
        }
    }

    /// Wrap stored fields in a document envelope, as couch-style
    /// indexes do with their `doc` member.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<SmolStr>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }
}

impl<M: Mapping> Mapping for DiscriminatorMapping<M> {
    fn field_name(&self, doc_type: &str, path: &str) -> FieldName {
        let mapped = self.inner.field_name(doc_type, path);
        match &self.prefix {
            Some(prefix) => FieldName::new(format!("{prefix}.{mapped}")),
            None => mapped,
        }
    }

    fn type_name(&self, doc_type: &str) -> TypeName {
        self.inner.type_name(doc_type)
    }

    fn default_criteria(&self, doc_type: &str) -> Option<Criteria> {
        let type_name = self.type_name(doc_type);
        Some(term(
            self.discriminator_field.clone(),
            type_name.as_str(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("Id", "id"; "single segment lowers its head")]
    #[test_case("HourlyWage", "hourlyWage"; "pascal becomes camel")]
    #[test_case("first_name", "firstName"; "snake becomes camel")]
    #[test_case("Address.ZipCode", "address.zipCode"; "each dotted segment maps alone")]
    fn default_mapping_camel_cases_each_segment(path: &str, expected: &str) {
        let mapped = DefaultMapping.field_name("Employee", path);
        assert_eq!(mapped.as_str(), expected);
    }

    #[test]
    fn default_mapping_camel_cases_the_type_name() {
        assert_eq!(DefaultMapping.type_name("Employee").as_str(), "employee");
    }

    #[test]
    fn default_mapping_leaves_queries_unscoped() {
        assert_eq!(DefaultMapping.default_criteria("Employee"), None);
    }

    #[test]
    fn discriminator_scopes_unscoped_queries_to_the_type() {
        let mapping = DiscriminatorMapping::new(DefaultMapping, "type");
        assert_eq!(
            mapping.default_criteria("Employee"),
            Some(term("type", "employee"))
        );
    }

    #[test]
    fn discriminator_prefix_wraps_mapped_fields() {
        let mapping = DiscriminatorMapping::new(DefaultMapping, "type").with_prefix("doc");
        assert_eq!(
            mapping.field_name("Employee", "HourlyWage").as_str(),
            "doc.hourlyWage"
        );
        assert_eq!(mapping.type_name("Employee").as_str(), "employee");
    }

    #[test]
    fn discriminator_without_prefix_passes_fields_through() {
        let mapping = DiscriminatorMapping::new(DefaultMapping, "type");
        assert_eq!(
            mapping.field_name("Employee", "HourlyWage").as_str(),
            "hourlyWage"
        );
    }
}
