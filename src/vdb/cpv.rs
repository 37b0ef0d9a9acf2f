// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Category/package-version identifiers as they appear in the VDB layout.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CpvError {
    #[error("Invalid package identifier (expected category/name-version): {0:?}")]
    Invalid(String),
}

/// `${CATEGORY}/${PF}` of an installed package, e.g. `net-misc/openssh-8.6_p1-r2`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(into = "String")]
pub struct Cpv {
    category: String,
    pf: String,
}

impl Cpv {
    #[must_use]
    pub fn new(category: impl Into<String>, pf: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            pf: pf.into(),
        }
    }

    #[must_use]
    pub fn category(&self) -> &str {
        &self.category
    }

    #[must_use]
    pub fn pf(&self) -> &str {
        &self.pf
    }

    /// The identifier as an exact-version package manager atom (`=category/pf`).
    #[must_use]
    pub fn atom(&self) -> String {
        format!("={self}")
    }
}

impl fmt::Display for Cpv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.category, self.pf)
    }
}

impl From<Cpv> for String {
    fn from(cpv: Cpv) -> Self {
        cpv.to_string()
    }
}

impl FromStr for Cpv {
    type Err = CpvError;

    /// Accepts `category/pf` with an optional leading `=`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let bare = trimmed.strip_prefix('=').unwrap_or(trimmed);
        match bare.split_once('/') {
            Some((category, pf))
                if !category.is_empty() && !pf.is_empty() && !pf.contains('/') =>
            {
                Ok(Self::new(category, pf))
            }
            _ => Err(CpvError::Invalid(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_atom() {
        let cpv = Cpv::new("cat", "libfoo-1.2");
        assert_eq!(cpv.to_string(), "cat/libfoo-1.2");
        assert_eq!(cpv.atom(), "=cat/libfoo-1.2");
    }

    #[test]
    fn test_parse_with_and_without_equals() {
        let expected = Cpv::new("dev-libs", "openssl-3.0.13-r1");
        assert_eq!("dev-libs/openssl-3.0.13-r1".parse::<Cpv>(), Ok(expected.clone()));
        assert_eq!("=dev-libs/openssl-3.0.13-r1".parse::<Cpv>(), Ok(expected));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!("openssl".parse::<Cpv>().is_err());
        assert!("/openssl-1".parse::<Cpv>().is_err());
        assert!("dev-libs/".parse::<Cpv>().is_err());
        assert!("a/b/c".parse::<Cpv>().is_err());
    }

    #[test]
    fn test_ordering_is_category_then_pf() {
        let mut cpvs = vec![
            Cpv::new("sys-libs", "zlib-1.3"),
            Cpv::new("app-misc", "foo-1"),
            Cpv::new("app-misc", "bar-2"),
        ];
        cpvs.sort();
        let rendered: Vec<String> = cpvs.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, ["app-misc/bar-2", "app-misc/foo-1", "sys-libs/zlib-1.3"]);
    }
}
