use foundation::{EmbeddingTargetId, PageName, ValidationError};
use url::Url;

use crate::params::Params;

/// What to show in the iframe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    EmbeddingTarget(EmbeddingTargetId),
    Page(PageName),
}

impl Source {
    pub fn path(&self) -> String {
        match self {
            Source::EmbeddingTarget(id) => format!("/w/{id}"),
            Source::Page(page) => format!("/public/pages/{}", page.as_str()),
        }
    }

    pub fn is_welcome_page(&self) -> bool {
        matches!(self, Source::Page(PageName::Welcome))
    }
}

impl From<EmbeddingTargetId> for Source {
    fn from(id: EmbeddingTargetId) -> Self {
        Source::EmbeddingTarget(id)
    }
}

impl From<PageName> for Source {
    fn from(page: PageName) -> Self {
        Source::Page(page)
    }
}

/// The validated base address of the remote application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseUrl {
    base: String,
    origin: String,
}

impl BaseUrl {
    /// Accepts an absolute URL; a trailing `/` is stripped.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let parsed = Url::parse(raw).map_err(|_| ValidationError::InvalidBaseUrl(raw.to_string()))?;
        if parsed.cannot_be_a_base() {
            return Err(ValidationError::InvalidBaseUrl(raw.to_string()));
        }
        let origin = parsed.origin();
        if !origin.is_tuple() {
            return Err(ValidationError::InvalidBaseUrl(raw.to_string()));
        }
        Ok(Self {
            base: raw.strip_suffix('/').unwrap_or(raw).to_string(),
            origin: origin.ascii_serialization(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.base
    }

    /// `scheme://host[:port]`, compared against inbound message origins.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// `{base}{path}?{query}`; the `?` is omitted when there are no parameters.
    pub fn url(&self, path: &str, params: &Params) -> Result<Url, ValidationError> {
        let query = params.encode()?;
        let mut url = Url::parse(&format!("{}{path}", self.base))
            .map_err(|e| ValidationError::Malformed(e.to_string()))?;
        if !query.is_empty() {
            url.set_query(Some(&query));
        }
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn welcome_page_address() {
        let base = BaseUrl::parse("https://example.test/app").unwrap();
        let url = base
            .url(&Source::Page(PageName::Welcome).path(), &Params::default())
            .unwrap();
        assert_eq!(url.as_str(), "https://example.test/app/public/pages/welcome");
        assert_eq!(base.origin(), "https://example.test");
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let base = BaseUrl::parse("https://example.test:8443/app/").unwrap();
        assert_eq!(base.as_str(), "https://example.test:8443/app");
        assert_eq!(base.origin(), "https://example.test:8443");
        let id = EmbeddingTargetId::new("my-view").unwrap();
        let params = Params {
            expand_navigator: true,
            ..Default::default()
        };
        let url = base.url(&Source::from(id).path(), &params).unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.test:8443/app/w/my-view?expandNavigator=true"
        );
    }

    #[test]
    fn rejects_relative_and_opaque_urls() {
        assert_eq!(
            BaseUrl::parse("/app").unwrap_err(),
            ValidationError::InvalidBaseUrl("/app".to_string())
        );
        assert!(BaseUrl::parse("mailto:someone@example.test").is_err());
    }
}
