use std::fmt;
use std::sync::Arc;

/// The domain entities the server caches lookups for.
///
/// The scope is the first component of every [`CacheKey`] and doubles as the
/// metric tag for cache accesses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryScope {
    Default,
    Announcement,
    Award,
    AwardAssignment,
    Claims,
    Enrollment,
    Hackathon,
    HackathonAdmin,
    Judge,
    Organizer,
    Questionnaire,
    RatingKind,
    Team,
    TeamMember,
    TeamWork,
    Token,
    User,
}

impl AsRef<str> for EntryScope {
    fn as_ref(&self) -> &str {
        match self {
            Self::Default => "default",
            Self::Announcement => "announcement",
            Self::Award => "award",
            Self::AwardAssignment => "award_assignment",
            Self::Claims => "claims",
            Self::Enrollment => "enrollment",
            Self::Hackathon => "hackathon",
            Self::HackathonAdmin => "hackathon_admin",
            Self::Judge => "judge",
            Self::Organizer => "organizer",
            Self::Questionnaire => "questionnaire",
            Self::RatingKind => "rating_kind",
            Self::Team => "team",
            Self::TeamMember => "team_member",
            Self::TeamWork => "team_work",
            Self::Token => "token",
            Self::User => "user",
        }
    }
}

impl fmt::Display for EntryScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

/// Identifies one cacheable computation.
///
/// The key is used both for the value store and the entry registry.
/// Uniqueness across call sites is the caller's responsibility: two call
/// sites sharing a key must cache the same value type.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct CacheKey(Arc<str>);

impl CacheKey {
    /// Builds the conventional `{scope}-{id}` key.
    pub fn new(scope: EntryScope, id: &str) -> Self {
        Self(format!("{}-{id}", scope.as_ref()).into())
    }

    /// Builds a key from a raw string, for callers that manage their own
    /// naming scheme.
    pub fn from_raw(key: impl Into<Arc<str>>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_format() {
        let key = CacheKey::new(EntryScope::Hackathon, "open2026");
        assert_eq!(key.as_str(), "hackathon-open2026");
        assert_eq!(key, CacheKey::from_raw("hackathon-open2026"));
    }

    #[test]
    fn test_scope_names() {
        let scopes = [
            (EntryScope::Default, "default"),
            (EntryScope::Announcement, "announcement"),
            (EntryScope::Award, "award"),
            (EntryScope::AwardAssignment, "award_assignment"),
            (EntryScope::Claims, "claims"),
            (EntryScope::Enrollment, "enrollment"),
            (EntryScope::Hackathon, "hackathon"),
            (EntryScope::HackathonAdmin, "hackathon_admin"),
            (EntryScope::Judge, "judge"),
            (EntryScope::Organizer, "organizer"),
            (EntryScope::Questionnaire, "questionnaire"),
            (EntryScope::RatingKind, "rating_kind"),
            (EntryScope::Team, "team"),
            (EntryScope::TeamMember, "team_member"),
            (EntryScope::TeamWork, "team_work"),
            (EntryScope::Token, "token"),
            (EntryScope::User, "user"),
        ];
        for (scope, name) in scopes {
            assert_eq!(scope.as_ref(), name);
        }
    }
}
