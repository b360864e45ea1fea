use std::borrow::Cow;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// At most one related record, backed by a foreign key.
    #[default]
    One,
    /// At most one related record, no foreign key is declared.
    OneNoFk,
    /// Any number of related records.
    Many,
}

/// Pair of fields joining the owning entity with the related one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMap {
    pub field: Cow<'static, str>,
    pub rel_field: Cow<'static, str>,
}

impl KeyMap {
    pub fn new(field: impl Into<Cow<'static, str>>, rel_field: impl Into<Cow<'static, str>>) -> Self {
        Self {
            field: field.into(),
            rel_field: rel_field.into(),
        }
    }
}

/// Named link from one entity to another.
#[derive(Debug, Clone)]
pub struct RelationDef {
    pub kind: RelationKind,
    /// Disambiguates multiple relations to the same entity (may be empty).
    pub title: Cow<'static, str>,
    pub rel_entity_name: Cow<'static, str>,
    pub key_maps: Vec<KeyMap>,
}

impl RelationDef {
    pub fn new(kind: RelationKind, rel_entity_name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind,
            title: Cow::Borrowed(""),
            rel_entity_name: rel_entity_name.into(),
            key_maps: Vec::new(),
        }
    }

    pub fn one(rel_entity_name: impl Into<Cow<'static, str>>) -> Self {
        Self::new(RelationKind::One, rel_entity_name)
    }

    pub fn many(rel_entity_name: impl Into<Cow<'static, str>>) -> Self {
        Self::new(RelationKind::Many, rel_entity_name)
    }

    pub fn title(mut self, title: impl Into<Cow<'static, str>>) -> Self {
        self.title = title.into();
        self
    }

    pub fn key_map(
        mut self,
        field: impl Into<Cow<'static, str>>,
        rel_field: impl Into<Cow<'static, str>>,
    ) -> Self {
        self.key_maps.push(KeyMap::new(field, rel_field));
        self
    }

    /// Title followed by the related entity name, the way relations are looked up.
    pub fn name(&self) -> String {
        format!("{}{}", self.title, self.rel_entity_name)
    }
}
