use serde::{Deserialize, Serialize};

/// Fixed permission enumeration. Checked as "does the user, via its role in
/// this project within this tenant, carry permission P?"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    ProjectRead,
    ProjectWrite,
    ProjectDelete,
    ProjectAdmin,
    DocumentRead,
    DocumentWrite,
    AgentExecute,
    AgentRead,
    AnalyticsRead,
    ExportDocuments,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Owner,
    Editor,
    Viewer,
}

impl Role {
    /// OWNER = all; EDITOR = read/write + execute; VIEWER = read only.
    pub fn permissions(self) -> &'static [Permission] {
        use Permission::*;
        match self {
            Role::Owner => &[
                ProjectRead,
                ProjectWrite,
                ProjectDelete,
                ProjectAdmin,
                DocumentRead,
                DocumentWrite,
                AgentExecute,
                AgentRead,
                AnalyticsRead,
                ExportDocuments,
            ],
            Role::Editor => &[
                ProjectRead,
                ProjectWrite,
                DocumentRead,
                DocumentWrite,
                AgentExecute,
                AgentRead,
                ExportDocuments,
            ],
            Role::Viewer => &[ProjectRead, DocumentRead, AgentRead],
        }
    }

    pub fn grants(self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }
}
