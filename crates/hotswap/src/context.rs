use std::fmt;

/// Identifies the project that owns an editor surface
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectId(String);

impl ProjectId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where an editor surface is hosted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Place {
    #[default]
    MainEditor,
    DiffViewer,
    Preview,
}

/// Host data available to toolbar registration and user actions
#[derive(Debug, Clone, Default)]
pub struct DataContext {
    pub project: Option<ProjectId>,
    pub place: Place,
}

impl DataContext {
    pub fn main_editor(project: ProjectId) -> Self {
        Self {
            project: Some(project),
            place: Place::MainEditor,
        }
    }

    pub fn is_inside_main_editor(&self) -> bool {
        self.place == Place::MainEditor
    }
}
