//! Fixed description of which arrays to pull from each granule.

use serde::{Deserialize, Serialize};

use crate::error::{SubsetError, SubsetResult};

/// Last segment of a slash-separated path.
pub fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// A variable path relative to a group root, with its column name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariablePath {
    pub path: String,
    pub basename: String,
}

impl VariablePath {
    /// Normalize and validate a group-relative path.
    ///
    /// Leading and trailing slashes are stripped; empty segments are rejected.
    pub fn parse(path: &str) -> SubsetResult<Self> {
        let trimmed = path.trim().trim_matches('/');
        if trimmed.is_empty() {
            return Err(SubsetError::Config(format!(
                "variable path '{}' is empty",
                path
            )));
        }
        if trimmed.split('/').any(|segment| segment.trim().is_empty()) {
            return Err(SubsetError::Config(format!(
                "variable path '{}' has an empty segment",
                path
            )));
        }

        Ok(Self {
            path: trimmed.to_string(),
            basename: basename(trimmed).to_string(),
        })
    }
}

/// Serialized form of a [`VariableSpec`], as written in parameter files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawVariableSpec {
    pub groups: Vec<String>,
    pub lon: String,
    pub lat: String,
    pub variables: Vec<String>,
}

/// Groups to iterate and, within each group, the arrays to extract.
///
/// Validated once on construction; every group is read with the same
/// longitude/latitude paths and the same ordered variable list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawVariableSpec", into = "RawVariableSpec")]
pub struct VariableSpec {
    groups: Vec<String>,
    lon: VariablePath,
    lat: VariablePath,
    variables: Vec<VariablePath>,
}

impl VariableSpec {
    pub fn new<G, V>(groups: G, lon: &str, lat: &str, variables: V) -> SubsetResult<Self>
    where
        G: IntoIterator,
        G::Item: Into<String>,
        V: IntoIterator,
        V::Item: AsRef<str>,
    {
        let groups: Vec<String> = groups
            .into_iter()
            .map(|g| g.into().trim().trim_matches('/').to_string())
            .collect();

        if groups.is_empty() {
            return Err(SubsetError::Config("variable spec names no groups".into()));
        }
        if let Some(pos) = groups.iter().position(|g| g.is_empty()) {
            return Err(SubsetError::Config(format!(
                "group name at position {} is empty",
                pos
            )));
        }
        for (i, group) in groups.iter().enumerate() {
            if groups[..i].contains(group) {
                return Err(SubsetError::Config(format!(
                    "group '{}' is listed more than once",
                    group
                )));
            }
        }

        let lon = VariablePath::parse(lon)?;
        let lat = VariablePath::parse(lat)?;
        let variables = variables
            .into_iter()
            .map(|v| VariablePath::parse(v.as_ref()))
            .collect::<SubsetResult<Vec<_>>>()?;

        Ok(Self {
            groups,
            lon,
            lat,
            variables,
        })
    }

    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    pub fn lon(&self) -> &VariablePath {
        &self.lon
    }

    pub fn lat(&self) -> &VariablePath {
        &self.lat
    }

    pub fn variables(&self) -> &[VariablePath] {
        &self.variables
    }

    /// Output column names, after last-segment naming and de-duplication.
    pub fn column_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::with_capacity(self.variables.len());
        for var in &self.variables {
            if !names.contains(&var.basename.as_str()) {
                names.push(&var.basename);
            }
        }
        names
    }
}

impl TryFrom<RawVariableSpec> for VariableSpec {
    type Error = SubsetError;

    fn try_from(raw: RawVariableSpec) -> Result<Self, Self::Error> {
        VariableSpec::new(raw.groups, &raw.lon, &raw.lat, raw.variables)
    }
}

impl From<VariableSpec> for RawVariableSpec {
    fn from(spec: VariableSpec) -> Self {
        RawVariableSpec {
            groups: spec.groups,
            lon: spec.lon.path,
            lat: spec.lat.path,
            variables: spec.variables.into_iter().map(|v| v.path).collect(),
        }
    }
}
