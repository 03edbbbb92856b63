use super::bounds::measure_hierarchy;
use super::error::AssetError;
use super::loading::LoadOutcome;
use bevy::prelude::*;
use bevy::scene::SceneInstanceReady;
use std::collections::VecDeque;

#[derive(Component, Debug, Clone, PartialEq)]
#[require(Transform, Visibility)]
pub(super) struct AutoScaledModel {
    pub(super) src: String,
    pub(super) target_size: f32,
}

impl AutoScaledModel {
    pub(super) fn new(src: impl Into<String>, target_size: f32) -> Self {
        Self {
            src: src.into(),
            target_size,
        }
    }
}

#[derive(Component, Debug, Clone)]
pub(super) struct AutoScaleState {
    pub(super) loaded_src: String,
    pub(super) scene: Handle<Scene>,
    pub(super) outcome: LoadOutcome,
    pub(super) measured_extent: Option<f32>,
    pub(super) scale: f32,
}

// One measurement, kept for the diagnostics overlay.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct AutoScaleRecord {
    pub(super) src: String,
    pub(super) max_extent: f32,
    pub(super) target_size: f32,
    pub(super) scale: f32,
}

#[derive(Resource, Debug, Clone)]
pub(super) struct AutoScaleLog {
    records: VecDeque<AutoScaleRecord>,
    capacity: usize,
}

impl Default for AutoScaleLog {
    fn default() -> Self {
        Self::with_capacity(32)
    }
}

impl AutoScaleLog {
    pub(super) fn with_capacity(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub(super) fn push(&mut self, record: AutoScaleRecord) {
        while self.records.len() >= self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    pub(super) fn records(&self) -> impl Iterator<Item = &AutoScaleRecord> {
        self.records.iter()
    }

    pub(super) fn len(&self) -> usize {
        self.records.len()
    }
}

// Degenerate extents and unusable targets keep `previous`.
pub(super) fn scale_for_extent(target_size: f32, max_extent: f32, previous: f32) -> f32 {
    if !(max_extent.is_finite() && max_extent > 0.0) {
        return previous;
    }
    if !(target_size.is_finite() && target_size > 0.0) {
        return previous;
    }
    let scale = target_size / max_extent;
    if scale.is_finite() && scale > 0.0 {
        scale
    } else {
        previous
    }
}

fn apply_scale(
    entity: Entity,
    model: &AutoScaledModel,
    state: &mut AutoScaleState,
    transform: &mut Transform,
    max_extent: f32,
    log: &mut AutoScaleLog,
) {
    if !(max_extent.is_finite() && max_extent > 0.0) {
        debug!(?entity, src = %model.src, max_extent, "degenerate bounds, keeping scale");
        transform.scale = Vec3::splat(state.scale);
        return;
    }

    let scale = scale_for_extent(model.target_size, max_extent, state.scale);
    info!(
        src = %model.src,
        max_extent,
        target_size = model.target_size,
        scale,
        "auto-scaled model"
    );
    log.push(AutoScaleRecord {
        src: model.src.clone(),
        max_extent,
        target_size: model.target_size,
        scale,
    });
    state.scale = scale;
    transform.scale = Vec3::splat(scale);
}

// A new source reloads. A new target size reuses the cached measurement.
pub(super) fn sync_model_requests(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    mut log: ResMut<AutoScaleLog>,
    mut models: Query<
        (
            Entity,
            &AutoScaledModel,
            Option<&mut AutoScaleState>,
            &mut Transform,
        ),
        Changed<AutoScaledModel>,
    >,
) {
    for (entity, model, state, mut transform) in &mut models {
        match state {
            Some(mut state) if state.loaded_src == model.src => {
                if let Some(extent) = state.measured_extent {
                    apply_scale(entity, model, &mut state, &mut transform, extent, &mut log);
                }
            }
            previous => {
                let scale = previous.as_ref().map_or(1.0, |state| state.scale);
                let scene: Handle<Scene> =
                    asset_server.load(GltfAssetLabel::Scene(0).from_asset(model.src.clone()));
                info!(src = %model.src, target_size = model.target_size, "loading model");
                commands.entity(entity).insert((
                    SceneRoot(scene.clone()),
                    AutoScaleState {
                        loaded_src: model.src.clone(),
                        scene,
                        outcome: LoadOutcome::Pending,
                        measured_extent: None,
                        scale,
                    },
                ));
            }
        }
    }
}

pub(super) fn measure_ready_scene(
    ready: On<SceneInstanceReady>,
    meshes: Res<Assets<Mesh>>,
    mut log: ResMut<AutoScaleLog>,
    mut queries: ParamSet<(
        Query<(Option<&Children>, Option<&Transform>, Option<&Mesh3d>)>,
        Query<(&AutoScaledModel, &mut AutoScaleState, &mut Transform)>,
    )>,
) {
    let entity = ready.entity;
    if !queries.p1().contains(entity) {
        return;
    }
    let _span = tracing::debug_span!("measure_model", ?entity).entered();
    let max_extent = measure_hierarchy(entity, &queries.p0(), &meshes).max_extent();

    let mut models = queries.p1();
    let Ok((model, mut state, mut transform)) = models.get_mut(entity) else {
        return;
    };
    state.outcome = LoadOutcome::Ready;
    state.measured_extent = Some(max_extent);
    apply_scale(entity, model, &mut state, &mut transform, max_extent, &mut log);
}

pub(super) fn track_model_failures(
    asset_server: Res<AssetServer>,
    mut states: Query<&mut AutoScaleState>,
) {
    for mut state in &mut states {
        if !state.outcome.is_pending() {
            continue;
        }
        let load_state = asset_server.recursive_dependency_load_state(state.scene.id());
        let path = state.loaded_src.clone();
        let outcome = LoadOutcome::from_load_state(&load_state, |reason| AssetError::Model {
            path,
            reason,
        });
        let LoadOutcome::Failed(err) = outcome else {
            continue;
        };
        error!("{err}");
        state.outcome = LoadOutcome::Failed(err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use bevy::scene::SceneSpawner;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn scale_is_target_over_extent(target in 0.01f32..100.0, extent in 0.01f32..1000.0) {
            let scale = scale_for_extent(target, extent, 1.0);
            prop_assert!((scale - target / extent).abs() <= 1e-6 * (target / extent).max(1.0));
        }

        #[test]
        fn degenerate_extent_keeps_previous(extent in -1000.0f32..=0.0, previous in 0.01f32..10.0) {
            prop_assert_eq!(scale_for_extent(1.2, extent, previous), previous);
        }

        #[test]
        fn result_is_always_positive_and_finite(
            target in prop::num::f32::ANY,
            extent in prop::num::f32::ANY,
        ) {
            let scale = scale_for_extent(target, extent, 1.0);
            prop_assert!(scale.is_finite());
            prop_assert!(scale > 0.0);
        }
    }

    #[test]
    fn non_finite_extent_keeps_previous() {
        assert_eq!(scale_for_extent(1.2, f32::NAN, 0.5), 0.5);
        assert_eq!(scale_for_extent(1.2, f32::INFINITY, 0.5), 0.5);
    }

    #[test]
    fn first_load_of_flat_model_stays_at_unit_scale() {
        assert_eq!(scale_for_extent(1.2, 0.0, 1.0), 1.0);
    }

    #[test]
    fn measuring_twice_is_idempotent() {
        let first = scale_for_extent(1.2, 3.7, 1.0);
        let second = scale_for_extent(1.2, 3.7, first);
        assert_eq!(first, second);
    }

    #[test]
    fn example_model_is_fit_to_target() {
        // A model 2.4 units on its longest side shrinks by half.
        assert_relative_eq!(scale_for_extent(1.2, 2.4, 1.0), 0.5);
    }

    fn record(src: &str) -> AutoScaleRecord {
        AutoScaleRecord {
            src: src.to_string(),
            max_extent: 1.0,
            target_size: 1.2,
            scale: 1.2,
        }
    }

    #[test]
    fn log_drops_oldest_records() {
        let mut log = AutoScaleLog::with_capacity(2);
        log.push(record("a"));
        log.push(record("b"));
        log.push(record("c"));
        let srcs: Vec<&str> = log.records().map(|r| r.src.as_str()).collect();
        assert_eq!(srcs, vec!["b", "c"]);
    }

    fn model_app() -> App {
        let mut app = App::new();
        app.add_plugins((MinimalPlugins, AssetPlugin::default()))
            .init_asset::<Scene>()
            .init_asset::<Mesh>()
            .init_resource::<AutoScaleLog>()
            .add_systems(Update, sync_model_requests)
            .add_observer(measure_ready_scene);
        app
    }

    fn scene_ready(app: &mut App, entity: Entity) {
        let instance_id = SceneSpawner::default().spawn(Handle::<Scene>::default());
        app.world_mut().trigger(SceneInstanceReady {
            entity,
            instance_id,
        });
    }

    fn scale_of(app: &App, entity: Entity) -> f32 {
        app.world().get::<Transform>(entity).unwrap().scale.x
    }

    #[test]
    fn ready_scene_is_measured_and_scaled() {
        let mut app = model_app();
        let model = app
            .world_mut()
            .spawn(AutoScaledModel::new("models/a.glb", 1.2))
            .id();
        app.update();
        let state = app.world().get::<AutoScaleState>(model).unwrap();
        assert!(state.outcome.is_pending());
        assert_eq!(state.loaded_src, "models/a.glb");

        let mesh = app
            .world_mut()
            .resource_mut::<Assets<Mesh>>()
            .add(Cuboid::new(1.0, 2.4, 0.5));
        app.world_mut().spawn((Mesh3d(mesh), ChildOf(model)));
        scene_ready(&mut app, model);

        assert_relative_eq!(scale_of(&app, model), 0.5, epsilon = 1e-5);
        let state = app.world().get::<AutoScaleState>(model).unwrap();
        assert_eq!(state.outcome, LoadOutcome::Ready);
        assert_relative_eq!(state.measured_extent.unwrap(), 2.4, epsilon = 1e-5);
        assert_eq!(app.world().resource::<AutoScaleLog>().len(), 1);
    }

    #[test]
    fn requests_rerun_only_when_the_model_changes() {
        let mut app = model_app();
        let model = app
            .world_mut()
            .spawn(AutoScaledModel::new("models/a.glb", 1.2))
            .id();
        app.update();
        let mesh = app
            .world_mut()
            .resource_mut::<Assets<Mesh>>()
            .add(Cuboid::new(1.0, 2.4, 0.5));
        app.world_mut().spawn((Mesh3d(mesh), ChildOf(model)));
        scene_ready(&mut app, model);

        for _ in 0..5 {
            app.update();
        }
        assert_eq!(app.world().resource::<AutoScaleLog>().len(), 1);

        app.world_mut()
            .get_mut::<AutoScaledModel>(model)
            .unwrap()
            .target_size = 0.6;
        app.update();
        assert_relative_eq!(scale_of(&app, model), 0.25, epsilon = 1e-5);
        assert_eq!(app.world().resource::<AutoScaleLog>().len(), 2);
        assert_eq!(
            app.world().get::<AutoScaleState>(model).unwrap().loaded_src,
            "models/a.glb"
        );

        app.update();
        assert_eq!(app.world().resource::<AutoScaleLog>().len(), 2);
    }

    #[test]
    fn ready_event_for_unrelated_entity_is_ignored() {
        let mut app = model_app();
        let other = app.world_mut().spawn(Transform::default()).id();
        scene_ready(&mut app, other);
        assert_eq!(app.world().resource::<AutoScaleLog>().len(), 0);
        assert_eq!(app.world().get::<Transform>(other).unwrap().scale, Vec3::ONE);
    }
}
