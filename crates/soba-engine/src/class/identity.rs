//! Class identity: `(name, version)` with canonical key `name:version`

use std::fmt;
use std::str::FromStr;

use crate::error::{EngineError, EngineResult};

/// Identity of a class description
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId {
    name: String,
    version: u32,
}

impl ClassId {
    /// Create an identity. Validity is checked when the identity is used to
    /// define a class, see [`ClassId::validate`].
    pub fn new(name: impl Into<String>, version: u32) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }

    /// Class name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Class version
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Canonical key (`name:version`)
    pub fn key(&self) -> String {
        self.to_string()
    }

    /// Check that the name is present and unambiguous and the version positive
    pub fn validate(&self) -> EngineResult<()> {
        if self.name.trim().is_empty() {
            return Err(EngineError::Validation(
                "Please provide class name".to_string(),
            ));
        }
        if self.name.contains(':') {
            return Err(EngineError::Validation(format!(
                "Class name '{}' must not contain ':'",
                self.name
            )));
        }
        if self.version == 0 {
            return Err(EngineError::Validation(format!(
                "Please provide class version for '{}' (must be at least 1)",
                self.name
            )));
        }
        Ok(())
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.version)
    }
}

impl FromStr for ClassId {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, version) = s.rsplit_once(':').ok_or_else(|| {
            EngineError::Validation(format!("Class id '{}' is not of the form name:version", s))
        })?;
        let version = version.parse::<u32>().map_err(|_| {
            EngineError::Validation(format!("Class id '{}' has an invalid version", s))
        })?;
        let id = ClassId::new(name, version);
        id.validate()?;
        Ok(id)
    }
}
