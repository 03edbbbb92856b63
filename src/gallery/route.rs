use bevy::prelude::*;
use std::fmt;

pub(super) const ROOT_PATH: &str = "/";
const ITEM_SEGMENT: &str = "item";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(super) struct PanelId(pub(super) String);

impl PanelId {
    pub(super) fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub(super) fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PanelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Route {
    Idle,
    Item(PanelId),
}

impl Route {
    // `/item/:id`, literal matched case-insensitively. Anything else is idle.
    pub(super) fn parse(path: &str) -> Self {
        let trimmed = path.trim();
        let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
        let mut segments = trimmed.split('/');

        match (segments.next(), segments.next(), segments.next(), segments.next()) {
            (Some(""), Some(literal), Some(id), None)
                if literal.eq_ignore_ascii_case(ITEM_SEGMENT) && !id.is_empty() =>
            {
                Route::Item(PanelId::new(id))
            }
            _ => Route::Idle,
        }
    }

    pub(super) fn path(&self) -> String {
        match self {
            Route::Idle => ROOT_PATH.to_string(),
            Route::Item(id) => item_path(id),
        }
    }

    pub(super) fn active_panel(&self) -> Option<&PanelId> {
        match self {
            Route::Idle => None,
            Route::Item(id) => Some(id),
        }
    }
}

pub(super) fn item_path(id: &PanelId) -> String {
    format!("/{ITEM_SEGMENT}/{id}")
}

#[derive(Resource, Debug, Clone, PartialEq, Eq)]
pub(super) struct Location {
    path: String,
}

impl Default for Location {
    fn default() -> Self {
        Self::new(ROOT_PATH)
    }
}

impl Location {
    pub(super) fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let path = if path.starts_with('/') {
            path
        } else {
            format!("/{path}")
        };
        Self { path }
    }

    pub(super) fn path(&self) -> &str {
        &self.path
    }

    pub(super) fn route(&self) -> Route {
        Route::parse(&self.path)
    }

    pub(super) fn active_panel(&self) -> Option<PanelId> {
        self.route().active_panel().cloned()
    }

    pub(super) fn is_active(&self, id: &PanelId) -> bool {
        self.active_panel().as_ref() == Some(id)
    }
}

#[derive(Message, Debug, Clone, PartialEq, Eq)]
pub(super) struct NavigateTo(pub(super) String);

impl NavigateTo {
    pub(super) fn item(id: &PanelId) -> Self {
        Self(item_path(id))
    }

    pub(super) fn root() -> Self {
        Self(ROOT_PATH.to_string())
    }
}

pub(super) fn apply_navigation(mut requests: MessageReader<NavigateTo>, mut location: ResMut<Location>) {
    for NavigateTo(path) in requests.read() {
        let next = Location::new(path.clone());
        if *location != next {
            info!(from = location.path(), to = next.path(), "navigate");
            *location = next;
        }
    }
}

pub(super) fn navigate_back_on_escape(
    keys: Res<ButtonInput<KeyCode>>,
    location: Res<Location>,
    mut navigate: MessageWriter<NavigateTo>,
) {
    if keys.just_pressed(KeyCode::Escape) && location.active_panel().is_some() {
        navigate.write(NavigateTo::root());
    }
}
