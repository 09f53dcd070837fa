//! Mapping processor
//!
//! The processor runs an ordered list of mapping entries. Each entry is
//! dispatched on its kind; MAP, SEPARATE, COMBINE and LOOKUP follow the same
//! pipeline:
//!
//! 1. read the input value(s)
//! 2. apply the input field actions
//! 3. run the kind-specific step
//! 4. convert to the output's declared type
//! 5. apply the output field actions
//! 6. write the output
//!
//! A failing entry is recorded as an ERROR audit and leaves its output unset;
//! the next entry still runs. Only contract violations escape.
//!
//! Copyright (c) 2025 Fieldmap Team
//! Licensed under the Apache-2.0 license

mod access;
mod kinds;
mod preview;


pub use preview::PreviewResult;

use crate::audit::{Audit, Audits};
use crate::config::ErrorPolicy;
use crate::context::EngineContext;
use crate::expression::ExpressionContext;
use crate::field::Field;
use crate::mapping::{LookupTable, Mapping};
use crate::session::Session;
use crate::{Error, Result};
use access::SessionAccess;

/// Everything an entry needs from the outside world
///
/// Implemented over a [`Session`] for full runs and over caller-supplied
/// values for previews, so both paths share one dispatcher.
pub(crate) trait FieldAccess: ExpressionContext {
    fn read_field(&self, field: &Field) -> Result<Field>;

    fn write_field(&mut self, field: &Field) -> Result<()>;

    fn lookup_table(&self, name: &str) -> Option<&LookupTable>;

    fn audits(&mut self) -> &mut Audits;
}

/// Runs mapping entries against documents
#[derive(Debug, Clone, Default)]
pub struct MappingProcessor {
    context: EngineContext,
}

impl MappingProcessor {
    pub fn new(context: EngineContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &EngineContext {
        &self.context
    }

    /// Run every mapping of the session's definition in declaration order
    pub fn process(&self, session: &mut Session) -> Result<()> {
        let mappings = session.definition().mappings.clone();
        self.process_mappings(session, &mappings)
    }

    /// Run `mappings` in order against the session's documents
    pub fn process_mappings(&self, session: &mut Session, mappings: &[Mapping]) -> Result<()> {
        let span = tracing::info_span!("process", definition = %session.definition().name);
        let _enter = span.enter();

        let properties = self.context.config().property_strategy();
        let mut access = SessionAccess::new(session, &properties, self.context.conversion());
        self.run_entries(&mut access, mappings)?;

        tracing::debug!(
            entries = mappings.len(),
            errors = session.audits().error_count(),
            warnings = session.audits().warning_count(),
            "run finished"
        );
        Ok(())
    }

    /// Run entries in order, honouring the error policy
    fn run_entries<A: FieldAccess>(&self, access: &mut A, mappings: &[Mapping]) -> Result<()> {
        for mapping in mappings {
            let mark = access.audits().mark();
            self.run_entry(access, mapping)?;
            if self.stops_after(access, mark) {
                tracing::warn!(mapping = %mapping.describe(), "stopping run after failed entry");
                break;
            }
        }
        Ok(())
    }

    /// Whether the error policy ends the run given the audits since `mark`
    fn stops_after<A: FieldAccess>(&self, access: &mut A, mark: usize) -> bool {
        self.context.config().error_policy == ErrorPolicy::StopOnError && access.audits().has_errors_since(mark)
    }

    /// Run one entry; any failure other than a contract violation becomes an ERROR audit
    fn run_entry<A: FieldAccess>(&self, access: &mut A, mapping: &Mapping) -> Result<()> {
        let span = tracing::debug_span!(
            "mapping",
            kind = %mapping.kind(),
            id = mapping.id().unwrap_or_default()
        );
        let _enter = span.enter();

        match self.dispatch(access, mapping) {
            Ok(()) => Ok(()),
            Err(e) if e.is_contract_violation() => Err(e),
            Err(e) => {
                tracing::warn!(error = %e, "mapping entry aborted");
                access.audits().push(entry_failure(mapping, &e));
                Ok(())
            }
        }
    }

    fn dispatch<A: FieldAccess>(&self, access: &mut A, mapping: &Mapping) -> Result<()> {
        match mapping {
            Mapping::Map(m) => self.process_map(access, m),
            Mapping::Separate(m) => self.process_separate(access, m),
            Mapping::Combine(m) => self.process_combine(access, m),
            Mapping::Lookup(m) => self.process_lookup(access, m),
            Mapping::Collection(m) => self.process_collection(access, m),
            Mapping::Expression(m) => self.process_expression(access, m),
        }
    }
}

fn entry_failure(mapping: &Mapping, error: &Error) -> Audit {
    let audit = Audit::error(format!("{} failed: {}", mapping.describe(), error));
    match error.path() {
        Some(path) => audit.with_path(path),
        None => match mapping.outputs().first() {
            Some(output) => audit.with_path(output.path.to_string()),
            None => audit,
        },
    }
}
