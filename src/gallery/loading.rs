use super::error::AssetError;
use super::settings::GallerySettings;
use bevy::asset::RecursiveDependencyLoadState;
use bevy::prelude::*;

const PROGRESS_LOG_SECS: f32 = 5.0;

#[derive(States, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub(super) enum AppState {
    #[default]
    Loading,
    Gallery,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(super) enum LoadOutcome {
    #[default]
    Pending,
    Ready,
    Failed(AssetError),
}

impl LoadOutcome {
    pub(super) fn is_pending(&self) -> bool {
        matches!(self, LoadOutcome::Pending)
    }

    pub(super) fn is_ready(&self) -> bool {
        matches!(self, LoadOutcome::Ready)
    }

    pub(super) fn from_load_state(
        state: &RecursiveDependencyLoadState,
        on_error: impl FnOnce(String) -> AssetError,
    ) -> Self {
        match state {
            RecursiveDependencyLoadState::Loaded => LoadOutcome::Ready,
            RecursiveDependencyLoadState::Failed(err) => LoadOutcome::Failed(on_error(err.to_string())),
            RecursiveDependencyLoadState::NotLoaded | RecursiveDependencyLoadState::Loading => {
                LoadOutcome::Pending
            }
        }
    }
}

#[derive(Debug, Clone)]
pub(super) struct FontSlot {
    pub(super) path: String,
    pub(super) handle: Handle<Font>,
    pub(super) outcome: LoadOutcome,
}

impl FontSlot {
    fn load(asset_server: &AssetServer, path: &str) -> Self {
        Self {
            path: path.to_string(),
            handle: asset_server.load(path.to_string()),
            outcome: LoadOutcome::Pending,
        }
    }

    pub(super) fn handle_or_default(&self) -> Handle<Font> {
        if self.outcome.is_ready() {
            self.handle.clone()
        } else {
            Handle::default()
        }
    }

    fn poll(&mut self, asset_server: &AssetServer) -> bool {
        if !self.outcome.is_pending() {
            return false;
        }
        let state = asset_server.recursive_dependency_load_state(self.handle.id());
        let path = self.path.clone();
        self.outcome = LoadOutcome::from_load_state(&state, |reason| AssetError::Font { path, reason });
        !self.outcome.is_pending()
    }
}

#[derive(Resource, Debug, Clone)]
pub(super) struct GalleryFonts {
    pub(super) regular: FontSlot,
    pub(super) medium: FontSlot,
}

impl GalleryFonts {
    pub(super) fn all_resolved(&self) -> bool {
        !self.regular.outcome.is_pending() && !self.medium.outcome.is_pending()
    }
}

pub(super) fn start_font_loads(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    settings: Res<GallerySettings>,
) {
    info!(
        regular = %settings.fonts.regular,
        medium = %settings.fonts.medium,
        "loading fonts"
    );
    commands.insert_resource(GalleryFonts {
        regular: FontSlot::load(&asset_server, &settings.fonts.regular),
        medium: FontSlot::load(&asset_server, &settings.fonts.medium),
    });
}

pub(super) fn poll_font_loads(
    asset_server: Res<AssetServer>,
    time: Res<Time>,
    mut fonts: ResMut<GalleryFonts>,
    mut next_state: ResMut<NextState<AppState>>,
    mut waited: Local<f32>,
) {
    let GalleryFonts { regular, medium } = &mut *fonts;
    for slot in [regular, medium] {
        if slot.poll(&asset_server) {
            match &slot.outcome {
                LoadOutcome::Failed(err) => warn!("{err}; using the built-in font"),
                _ => debug!(path = %slot.path, "font ready"),
            }
        }
    }

    if fonts.all_resolved() {
        next_state.set(AppState::Gallery);
        return;
    }

    *waited += time.delta_secs();
    if *waited >= PROGRESS_LOG_SECS {
        *waited = 0.0;
        info!("still waiting for fonts");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn font_error(reason: String) -> AssetError {
        AssetError::Font {
            path: "fonts/x.ttf".to_string(),
            reason,
        }
    }

    #[test]
    fn loading_states_map_to_outcomes() {
        assert_eq!(
            LoadOutcome::from_load_state(&RecursiveDependencyLoadState::Loading, font_error),
            LoadOutcome::Pending
        );
        assert_eq!(
            LoadOutcome::from_load_state(&RecursiveDependencyLoadState::NotLoaded, font_error),
            LoadOutcome::Pending
        );
        assert_eq!(
            LoadOutcome::from_load_state(&RecursiveDependencyLoadState::Loaded, font_error),
            LoadOutcome::Ready
        );
    }

    #[test]
    fn failed_load_keeps_the_reason() {
        let err = bevy::asset::AssetLoadError::AssetLoaderPanic {
            path: bevy::asset::AssetPath::from("fonts/x.ttf"),
            loader_name: "ttf",
        };
        let outcome = LoadOutcome::from_load_state(
            &RecursiveDependencyLoadState::Failed(Arc::new(err)),
            font_error,
        );
        let LoadOutcome::Failed(AssetError::Font { path, reason }) = outcome else {
            panic!("expected a font failure, got {outcome:?}");
        };
        assert_eq!(path, "fonts/x.ttf");
        assert!(reason.contains("ttf"));
    }

    #[test]
    fn failed_font_falls_back_to_default_handle() {
        let slot = FontSlot {
            path: "fonts/missing.ttf".to_string(),
            handle: Handle::default(),
            outcome: LoadOutcome::Failed(font_error("gone".to_string())),
        };
        assert_eq!(slot.handle_or_default(), Handle::<Font>::default());
    }
}
