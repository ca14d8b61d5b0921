use crate::model::{Recurrence, Task, TaskLevel};

/// Tasks shown per page.
pub const PAGE_SIZE: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    /// Keep the collection's insertion order, whatever the direction.
    #[default]
    Default,
    Level,
    Name,
    CreatedAt,
}

impl SortField {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "default" => Some(Self::Default),
            "level" => Some(Self::Level),
            "name" => Some(Self::Name),
            "created" | "created_at" | "createdat" => Some(Self::CreatedAt),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Some(Self::Asc),
            "desc" | "descending" => Some(Self::Desc),
            _ => None,
        }
    }
}

/// Filter, sort and page specification. `None` filters match everything.
#[derive(Debug, Clone, Default)]
pub struct TaskQuery {
    pub keyword: Option<String>,
    pub level: Option<TaskLevel>,
    pub recurrence: Option<Recurrence>,
    /// Comma-separated tag terms; a task must carry every term
    /// (case-insensitive exact match per term).
    pub tags: Option<String>,
    pub sort_field: SortField,
    pub sort_order: SortOrder,
    /// 1-based; clamped into the valid range.
    pub page: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub tasks: Vec<Task>,
    pub current_page: usize,
    pub total_pages: usize,
    pub total_count: usize,
}

/// Pure projection over a snapshot of the task collection. Applies the
/// keyword, level, recurrence and tag filters in that order, then sorts,
/// then pages.
pub fn run_query(tasks: &[Task], query: &TaskQuery) -> Page {
    let mut matched: Vec<Task> = tasks
        .iter()
        .filter(|task| matches_keyword(task, query.keyword.as_deref()))
        .filter(|task| query.level.is_none_or(|level| task.level == level))
        .filter(|task| {
            query
                .recurrence
                .is_none_or(|recurrence| task.recurrence == recurrence)
        })
        .filter(|task| matches_tags(task, query.tags.as_deref()))
        .cloned()
        .collect();

    sort_tasks(&mut matched, query.sort_field, query.sort_order);
    paginate(matched, query.page)
}

fn matches_keyword(task: &Task, keyword: Option<&str>) -> bool {
    let Some(keyword) = keyword.map(str::trim).filter(|value| !value.is_empty()) else {
        return true;
    };

    let needle = keyword.to_lowercase();
    task.name.to_lowercase().contains(&needle) || task.description.to_lowercase().contains(&needle)
}

fn matches_tags(task: &Task, expression: Option<&str>) -> bool {
    let Some(expression) = expression else {
        return true;
    };

    let wanted: Vec<&str> = expression
        .split(',')
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .collect();

    wanted.iter().all(|term| {
        let term = term.to_lowercase();
        task.tags.iter().any(|tag| tag.to_lowercase() == term)
    })
}

// Descending runs through a reversed comparator rather than
// sort-then-reverse, so equal-key tasks keep their insertion order in
// both directions.
fn sort_tasks(tasks: &mut [Task], field: SortField, order: SortOrder) {
    match field {
        SortField::Default => {}
        SortField::Level => sort_by_key_in(tasks, order, |task| task.level.order()),
        SortField::Name => sort_by_key_in(tasks, order, |task| task.name.clone()),
        SortField::CreatedAt => sort_by_key_in(tasks, order, |task| task.created_at.clone()),
    }
}

fn sort_by_key_in<K: Ord>(tasks: &mut [Task], order: SortOrder, key: impl Fn(&Task) -> K) {
    match order {
        SortOrder::Asc => tasks.sort_by(|a, b| key(a).cmp(&key(b))),
        SortOrder::Desc => tasks.sort_by(|a, b| key(b).cmp(&key(a))),
    }
}

fn paginate(tasks: Vec<Task>, page: usize) -> Page {
    let total_count = tasks.len();
    let total_pages = (total_count.div_ceil(PAGE_SIZE)).max(1);
    let current_page = page.clamp(1, total_pages);

    let start = (current_page - 1) * PAGE_SIZE;
    let tasks = tasks
        .into_iter()
        .skip(start)
        .take(PAGE_SIZE)
        .collect();

    Page {
        tasks,
        current_page,
        total_pages,
        total_count,
    }
}
