use crate::KeyMap;
use std::{
    borrow::Cow,
    fmt::{self, Display, Formatter},
};

/// Aggregate function applied to a view alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Count,
    CountDistinct,
    Min,
    Max,
    Sum,
    Avg,
}

impl Display for Aggregate {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Aggregate::Count | Aggregate::CountDistinct => "COUNT",
            Aggregate::Min => "MIN",
            Aggregate::Max => "MAX",
            Aggregate::Sum => "SUM",
            Aggregate::Avg => "AVG",
        })
    }
}

/// Entity taking part in a view, under a short alias.
#[derive(Debug, Clone)]
pub struct ViewMember {
    pub alias: Cow<'static, str>,
    pub entity_name: Cow<'static, str>,
}

/// Field of the view, projected from a member field.
#[derive(Debug, Clone)]
pub struct ViewAlias {
    pub name: Cow<'static, str>,
    pub member_alias: Cow<'static, str>,
    pub field: Cow<'static, str>,
    pub group_by: bool,
    pub function: Option<Aggregate>,
}

/// Join between two members. `optional` turns it into a left outer join.
#[derive(Debug, Clone)]
pub struct ViewLink {
    pub alias: Cow<'static, str>,
    pub rel_alias: Cow<'static, str>,
    pub optional: bool,
    pub key_maps: Vec<KeyMap>,
}

#[derive(Debug, Clone, Default)]
pub struct ViewDef {
    pub members: Vec<ViewMember>,
    pub aliases: Vec<ViewAlias>,
    pub links: Vec<ViewLink>,
}

impl ViewDef {
    pub fn alias(&self, name: &str) -> Option<&ViewAlias> {
        self.aliases.iter().find(|v| v.name == name)
    }

    pub fn member(&self, alias: &str) -> Option<&ViewMember> {
        self.members.iter().find(|v| v.alias == alias)
    }

    /// Views with aggregates or group-by aliases produce one row per group.
    pub fn is_grouped(&self) -> bool {
        self.aliases
            .iter()
            .any(|v| v.group_by || v.function.is_some())
    }

    /// The link that brings `alias` into the join, if any.
    pub fn link_to(&self, alias: &str) -> Option<&ViewLink> {
        self.links.iter().find(|v| v.rel_alias == alias)
    }
}
