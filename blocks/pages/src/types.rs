use serde::Serialize;

use tarefas_atoms::comments::Comment;
use tarefas_atoms::session::SessionUser;
use tarefas_atoms::tasks::Task;

pub const HOME_ROUTE: &str = "/";

// ========== REDIRECT ==========
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Redirect {
    pub destination: String,
    pub permanent: bool,
}

impl Redirect {
    pub fn home() -> Self {
        Self {
            destination: HOME_ROUTE.to_string(),
            permanent: false,
        }
    }
}

/// Outcome of a server-side page fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum Page<P> {
    Render(P),
    Redirect(Redirect),
}

// ========== TASK DETAIL ==========
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct TaskItem {
    pub task: String,
    pub public: bool,
    /// Display date, already formatted
    pub created: String,
    pub user: String,
    #[serde(rename = "taskId")]
    pub task_id: String,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct TaskPageProps {
    pub item: TaskItem,
    #[serde(rename = "allComments")]
    pub all_comments: Vec<Comment>,
}

// ========== DASHBOARD ==========
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct DashboardUser {
    pub email: String,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct DashboardProps {
    pub user: DashboardUser,
    pub tasks: Vec<Task>,
}

// ========== HEADER ==========
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Authenticated,
    Unauthenticated,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct HeaderLinks {
    pub dashboard: bool,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct HeaderView {
    pub status: SessionStatus,
    pub user: Option<SessionUser>,
    pub links: HeaderLinks,
}
