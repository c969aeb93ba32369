//! Identifiers of the remote application and their format checks.

use base64::Engine as _;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

// Link ids are url-safe base64; padding and trailing bits are not enforced.
const LINK_ID_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// `^[a-z0-9]+(?:-[a-z0-9]+)*$`
pub fn is_kebab_case(value: &str) -> bool {
    !value.is_empty()
        && value.split('-').all(|segment| {
            !segment.is_empty()
                && segment
                    .bytes()
                    .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
        })
}

/// `^[\w -]{1,255}$`
pub fn is_repository_name(value: &str) -> bool {
    let len = value.chars().count();
    (1..=255).contains(&len)
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ' ' || c == '-')
}

pub fn is_url_safe_base64(value: &str) -> bool {
    !value.is_empty() && LINK_ID_ENGINE.decode(value).is_ok()
}

/// The name of an independently embeddable unit (view, worksheet, workbook).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EmbeddingTargetId(String);

impl EmbeddingTargetId {
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        if !is_kebab_case(&value) {
            return Err(ValidationError::InvalidEmbeddingTargetId(value));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for EmbeddingTargetId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<EmbeddingTargetId> for String {
    fn from(id: EmbeddingTargetId) -> Self {
        id.0
    }
}

impl std::fmt::Display for EmbeddingTargetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The ID of a navigator item, e.g. `ROOT.MyFolder`. Not format-checked.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GlobalId(pub String);

impl GlobalId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A well-known page of the remote application.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageName {
    Welcome,
}

impl PageName {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageName::Welcome => "welcome",
        }
    }
}

impl std::str::FromStr for PageName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "welcome" => Ok(PageName::Welcome),
            _ => Err(ValidationError::InvalidPageName(s.to_string())),
        }
    }
}

/// Qualifies an external link the remote side uses to learn the caller's origin.
///
/// Both parts come from the link's management URL:
/// `<baseUrl>/admin/repositories/<repositoryName>/external-links/<externalLinkId>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalLinkKey {
    pub repository_name: String,
    pub external_link_id: String,
}

impl ExternalLinkKey {
    pub fn new(
        repository_name: impl Into<String>,
        external_link_id: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let key = Self {
            repository_name: repository_name.into(),
            external_link_id: external_link_id.into(),
        };
        key.validate()?;
        Ok(key)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if is_repository_name(&self.repository_name)
            && is_url_safe_base64(&self.external_link_id)
        {
            Ok(())
        } else {
            Err(ValidationError::InvalidWebApplication {
                repository_name: self.repository_name.clone(),
                external_link_id: self.external_link_id.clone(),
            })
        }
    }
}
