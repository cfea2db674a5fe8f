//! Loads machine profiles from TOML or JSON files. Fields missing from the file keep the
//! values of the default profile.
use std::fmt;
use std::path::Path;

use log::debug;

use super::MachineProfile;
use crate::error::Error;

impl MachineProfile {
    fn create_parser() -> Result<config::Config, Error> {
        let mut parser = config::Config::new();
        // An empty source would otherwise deserialize as a unit value instead of a
        // profile; an explicit default for the name keeps the parse going.
        parser.set_default("name", MachineProfile::default().name)?;
        Ok(parser)
    }

    fn finish(parser: config::Config) -> Result<Self, Error> {
        let profile = parser.try_into::<Self>()?;
        profile.validate()?;
        debug!("loaded machine profile {}", profile.name);
        Ok(profile)
    }

    /// Loads a profile from a TOML or JSON file, depending on its extension.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let mut parser = Self::create_parser()?;
        parser.merge(config::File::from(path.as_ref()))?;
        Self::finish(parser)
    }

    /// Parses a profile from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let mut parser = Self::create_parser()?;
        parser.merge(config::File::from_str(json, config::FileFormat::Json))?;
        Self::finish(parser)
    }

    /// Parses a profile from a TOML string.
    pub fn from_toml(toml: &str) -> Result<Self, Error> {
        let mut parser = Self::create_parser()?;
        parser.merge(config::File::from_str(toml, config::FileFormat::Toml))?;
        Self::finish(parser)
    }
}

impl fmt::Display for MachineProfile {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let text = toml::to_string(self).map_err(|_| fmt::Error)?;
        write!(f, "{}", text)
    }
}
