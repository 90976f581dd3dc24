use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use error_common::RegistryError;
use serde::{Deserialize, Serialize};

/// CPU architecture a package was compiled for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    X86,
    X64,
    Arm,
    Arm64,
}

/// Operating system a package was compiled for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Os {
    #[serde(rename = "windows")]
    Windows,
    #[serde(rename = "macOS")]
    MacOs,
    #[serde(rename = "freebsd")]
    FreeBsd,
    #[serde(rename = "linux")]
    Linux,
}

/// Hash used for package checksums
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    Sha256,
    Sha512,
}

impl Arch {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::X86 => "x86",
            Self::X64 => "x64",
            Self::Arm => "arm",
            Self::Arm64 => "arm64",
        }
    }
}

impl Os {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Windows => "windows",
            Self::MacOs => "macOS",
            Self::FreeBsd => "freebsd",
            Self::Linux => "linux",
        }
    }
}

impl Algorithm {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
        }
    }
}

impl FromStr for Arch {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "x86" => Ok(Self::X86),
            "x64" => Ok(Self::X64),
            "arm" => Ok(Self::Arm),
            "arm64" => Ok(Self::Arm64),
            other => Err(RegistryError::validation(format!("unsupported architecture {other:?}"))),
        }
    }
}

impl FromStr for Os {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "windows" => Ok(Self::Windows),
            "macOS" => Ok(Self::MacOs),
            "freebsd" => Ok(Self::FreeBsd),
            "linux" => Ok(Self::Linux),
            other => Err(RegistryError::validation(format!("unsupported operating system {other:?}"))),
        }
    }
}

impl FromStr for Algorithm {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sha256" => Ok(Self::Sha256),
            "sha512" => Ok(Self::Sha512),
            other => Err(RegistryError::validation(format!("unsupported checksum algorithm {other:?}"))),
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    pub email: String,
}

/// Plugin tarball built for one architecture and operating system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub name: String,
    pub arch: Arch,
    pub os: Os,
    pub url: String,
    pub checksum: String,
    pub algorithm: Algorithm,
}

/// Indexed metadata of one published plugin version.
///
/// `id`, `account_id` and `published_at` are assigned by the registry at
/// publish time; whatever the client sends for them is overwritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub account_id: String,
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub author: Author,
    #[serde(default)]
    pub license: String,
    #[serde(default)]
    pub homepage: String,
    #[serde(default)]
    pub packages: Vec<Package>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

impl Manifest {
    /// Whether every term appears, case-insensitively, in the searchable fields
    pub fn matches_terms(&self, terms: &[String]) -> bool {
        let haystack = [
            self.name.as_str(),
            self.description.as_str(),
            self.author.name.as_str(),
            self.license.as_str(),
        ]
        .join(" ")
        .to_lowercase();

        terms.iter().all(|term| haystack.contains(term.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_names_round_trip_through_strings() {
        assert_eq!("macOS".parse::<Os>().unwrap(), Os::MacOs);
        assert_eq!(Os::MacOs.to_string(), "macOS");
        assert_eq!("arm64".parse::<Arch>().unwrap().as_str(), "arm64");
        assert!("MIPS".parse::<Arch>().is_err());
        assert!(matches!("md5".parse::<Algorithm>(), Err(RegistryError::ValidationError(_))));
    }
}
