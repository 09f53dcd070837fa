//! Field access over a session's documents
//!
//! Copyright (c) 2025 Fieldmap Team
//! Licensed under the Apache-2.0 license

use super::FieldAccess;
use crate::audit::Audits;
use crate::conversion::ConversionService;
use crate::document::{CONSTANTS_DOC_ID, PROPERTIES_DOC_ID};
use crate::expression::{ExpressionContext, FieldRef};
use crate::field::Field;
use crate::mapping::LookupTable;
use crate::path::PathExpression;
use crate::properties::PropertyStrategy;
use crate::session::Session;
use crate::types::{FieldType, FieldValue};
use crate::{Error, Result};

pub(super) struct SessionAccess<'s> {
    session: &'s mut Session,
    properties: &'s PropertyStrategy,
    conversion: &'s ConversionService,
}

impl<'s> SessionAccess<'s> {
    pub(super) fn new(
        session: &'s mut Session,
        properties: &'s PropertyStrategy,
        conversion: &'s ConversionService,
    ) -> Self {
        Self {
            session,
            properties,
            conversion,
        }
    }

    fn property(&self, path: &PathExpression) -> Field {
        let name = virtual_name(path);
        let definition = self.session.definition();
        match self
            .properties
            .resolve(&name, self.session.runtime_properties(), &definition.properties)
        {
            Some(resolved) => self.typed(PROPERTIES_DOC_ID, path, &resolved.value, resolved.field_type),
            None => Field::new(path.clone(), FieldType::None).with_doc_id(PROPERTIES_DOC_ID),
        }
    }

    fn constant(&self, path: &PathExpression) -> Field {
        let name = virtual_name(path);
        match self.session.definition().constant(&name) {
            Some(constant) => self.typed(CONSTANTS_DOC_ID, path, &constant.value, constant.field_type),
            None => Field::new(path.clone(), FieldType::None).with_doc_id(CONSTANTS_DOC_ID),
        }
    }

    /// Property and constant text converted to its declared type
    fn typed(&self, doc_id: &str, path: &PathExpression, text: &str, field_type: FieldType) -> Field {
        let raw = FieldValue::String(text.to_string());
        let value = match self.conversion.convert_type(raw.clone(), Some(FieldType::String), field_type) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("'{}' in {} kept as text: {}", path, doc_id, e);
                raw
            }
        };
        Field::new(path.clone(), value.field_type())
            .with_value(value)
            .with_doc_id(doc_id)
    }
}

/// Property or constant name addressed by a virtual-document path
fn virtual_name(path: &PathExpression) -> String {
    path.to_string().trim_start_matches('/').to_string()
}

impl ExpressionContext for SessionAccess<'_> {
    fn resolve(&self, reference: &FieldRef) -> Result<Field> {
        let mut field = Field::new(reference.path_expression(), FieldType::Any);
        field.doc_id = reference.doc_id.clone();
        self.read_field(&field).map_err(|e| match e {
            Error::Document { message, .. } => Error::expression(message, reference.to_string()),
            other => other,
        })
    }
}

impl FieldAccess for SessionAccess<'_> {
    fn read_field(&self, field: &Field) -> Result<Field> {
        match field.doc_id.as_deref() {
            Some(PROPERTIES_DOC_ID) => Ok(self.property(&field.path)),
            Some(CONSTANTS_DOC_ID) => Ok(self.constant(&field.path)),
            doc_id => self.session.source_for(doc_id)?.read_value(field),
        }
    }

    fn write_field(&mut self, field: &Field) -> Result<()> {
        match field.doc_id.as_deref() {
            Some(doc_id @ (PROPERTIES_DOC_ID | CONSTANTS_DOC_ID)) => Err(Error::Document {
                doc_id: Some(doc_id.to_string()),
                message: format!("'{}' is read-only", doc_id),
            }),
            doc_id => self.session.target_for(doc_id)?.write_value(field),
        }
    }

    fn lookup_table(&self, name: &str) -> Option<&LookupTable> {
        self.session.lookup_table(name)
    }

    fn audits(&mut self) -> &mut Audits {
        self.session.audits_mut()
    }
}
