use crate::SourceFrontend;
use crate::types::{BranchKinds, EngineError, SourceUnit, StructuralModel};

/// Registry for managing available source front ends
pub struct FrontendRegistry {
    frontends: Vec<Box<dyn SourceFrontend>>,
}

impl FrontendRegistry {
    pub fn new() -> Self {
        Self {
            frontends: Vec::new(),
        }
    }

    /// Register a source front end
    pub fn register<T: SourceFrontend + 'static>(&mut self, frontend: T) {
        self.frontends.push(Box::new(frontend));
    }

    /// Determine the front end from a unit's file extension
    pub fn frontend_for(&self, unit: &SourceUnit) -> Option<&dyn SourceFrontend> {
        let extension = unit.extension()?;
        self.frontends
            .iter()
            .find(|f| {
                f.extensions()
                    .iter()
                    .any(|ext| ext.eq_ignore_ascii_case(extension))
            })
            .map(|f| f.as_ref())
    }

    /// Get all registered language names
    pub fn all_languages(&self) -> Vec<&str> {
        self.frontends.iter().map(|f| f.name()).collect()
    }

    /// Build the structural model for a unit with the matching front end
    pub fn build(
        &self,
        unit: &SourceUnit,
        kinds: &BranchKinds,
    ) -> Result<StructuralModel, EngineError> {
        let frontend = self.frontend_for(unit).ok_or_else(|| {
            EngineError::instrumentation(&unit.name, "no front end registered for this extension")
        })?;
        frontend.build(unit, kinds)
    }
}

impl Default for FrontendRegistry {
    fn default() -> Self {
        Self::new()
    }
}
