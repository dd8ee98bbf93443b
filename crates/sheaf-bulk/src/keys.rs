//! Store keys holding one bulk action's status fields.

use sheaf_core::BulkActionId;

/// Key namespace scoped by a bulk action identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusKeys {
    /// `<id>:state`
    pub state: String,
    /// `<id>:creationDate`
    pub creation_date: String,
    /// `<id>:command`
    pub command: String,
    /// `<id>:count`
    pub count: String,
}

impl StatusKeys {
    /// Keys for `id`.
    #[must_use]
    pub fn for_id(id: &BulkActionId) -> Self {
        Self {
            state: format!("{id}:state"),
            creation_date: format!("{id}:creationDate"),
            command: format!("{id}:command"),
            count: format!("{id}:count"),
        }
    }
}
