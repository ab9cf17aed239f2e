//! Predefined (canned) access-control lists

use crate::error::Error;
use std::str::FromStr;

/// Access control applied to each uploaded object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredefinedAcl {
    AuthenticatedRead,
    BucketOwnerFullControl,
    BucketOwnerRead,
    Private,
    ProjectPrivate,
    PublicRead,
}

impl PredefinedAcl {
    /// Input name, as accepted by the `predefinedAcl` parameter
    pub fn as_str(&self) -> &'static str {
        match self {
            PredefinedAcl::AuthenticatedRead => "authenticatedRead",
            PredefinedAcl::BucketOwnerFullControl => "bucketOwnerFullControl",
            PredefinedAcl::BucketOwnerRead => "bucketOwnerRead",
            PredefinedAcl::Private => "private",
            PredefinedAcl::ProjectPrivate => "projectPrivate",
            PredefinedAcl::PublicRead => "publicRead",
        }
    }

    /// Canned ACL header value
    pub fn canned(&self) -> &'static str {
        match self {
            PredefinedAcl::AuthenticatedRead => "authenticated-read",
            PredefinedAcl::BucketOwnerFullControl => "bucket-owner-full-control",
            PredefinedAcl::BucketOwnerRead => "bucket-owner-read",
            PredefinedAcl::Private => "private",
            PredefinedAcl::ProjectPrivate => "project-private",
            PredefinedAcl::PublicRead => "public-read",
        }
    }

    const ALL: [PredefinedAcl; 6] = [
        PredefinedAcl::AuthenticatedRead,
        PredefinedAcl::BucketOwnerFullControl,
        PredefinedAcl::BucketOwnerRead,
        PredefinedAcl::Private,
        PredefinedAcl::ProjectPrivate,
        PredefinedAcl::PublicRead,
    ];
}

impl FromStr for PredefinedAcl {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        PredefinedAcl::ALL
            .into_iter()
            .find(|acl| acl.as_str().eq_ignore_ascii_case(s) || acl.canned().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::InvalidAcl(s.to_string()))
    }
}

impl std::fmt::Display for PredefinedAcl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
