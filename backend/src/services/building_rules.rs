//! Contract-code to building mapping.
//!
//! Roster rows do not carry a building column; the owning building is
//! inferred from a short alphabetic code embedded in the contract name,
//! e.g. "Договор №ЦР-12/2024" carries the code "ЦР". The mapping is an
//! ordered rule table loaded from configuration so that new codes are data
//! changes, not code changes.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildingRule {
    pub code: String,
    pub building: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildingRules {
    /// Marker preceding the code inside a contract name.
    #[serde(default = "default_marker")]
    pub marker: String,
    /// Building used when no code is present or the code is unknown.
    pub default_building: String,
    /// Ordered rules; the first matching code wins.
    pub rules: Vec<BuildingRule>,
}

fn default_marker() -> String {
    "№".to_string()
}

/// Outcome of deriving a building from a contract name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildingMatch {
    /// A known code mapped to its building.
    Mapped(String),
    /// A code was present but not in the table; the default applies and the
    /// caller should record a warning.
    UnknownCode { code: String, building: String },
    /// No code in the contract name; the default applies silently.
    NoCode(String),
}

impl BuildingMatch {
    pub fn building_name(&self) -> &str {
        match self {
            BuildingMatch::Mapped(name) => name,
            BuildingMatch::UnknownCode { building, .. } => building,
            BuildingMatch::NoCode(name) => name,
        }
    }
}

impl Default for BuildingRules {
    fn default() -> Self {
        Self {
            marker: default_marker(),
            default_building: "Основной рынок".to_string(),
            rules: vec![
                BuildingRule {
                    code: "ОР".to_string(),
                    building: "Основной рынок".to_string(),
                },
                BuildingRule {
                    code: "ЦР".to_string(),
                    building: "Центральный рынок".to_string(),
                },
                BuildingRule {
                    code: "ВР".to_string(),
                    building: "Восточный рынок".to_string(),
                },
            ],
        }
    }
}

impl BuildingRules {
    pub fn from_json(json: &str) -> Result<Self, String> {
        serde_json::from_str(json).map_err(|e| format!("Invalid building rules: {}", e))
    }

    pub fn from_file(path: &str) -> Result<Self, String> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| format!("Cannot read building rules from '{}': {}", path, e))?;
        Self::from_json(&json)
    }

    /// Extracts the building code from a contract name: the leading
    /// alphabetic run of the first token after the marker. A token starting
    /// with a digit means the contract carries no code.
    fn extract_code(&self, contract_name: &str) -> Option<String> {
        let after_marker = contract_name.split_once(&self.marker)?.1;
        let token = after_marker.split_whitespace().next()?;
        let code: String = token.chars().take_while(|c| c.is_alphabetic()).collect();
        if code.is_empty() {
            return None;
        }
        Some(code)
    }

    /// Derives the owning building for a contract name.
    pub fn building_for_contract(&self, contract_name: &str) -> BuildingMatch {
        let code = match self.extract_code(contract_name) {
            Some(code) => code,
            None => return BuildingMatch::NoCode(self.default_building.clone()),
        };

        let code_upper = code.to_uppercase();
        for rule in &self.rules {
            if rule.code.to_uppercase() == code_upper {
                return BuildingMatch::Mapped(rule.building.clone());
            }
        }

        BuildingMatch::UnknownCode {
            code,
            building: self.default_building.clone(),
        }
    }
}
