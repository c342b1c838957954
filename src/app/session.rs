use tracing::{debug, info, warn};

use crate::config::{GraphConfig, ViewerConfig};
use crate::content::ContentIndex;
use crate::content::slug::normalize;

use super::graph::interaction::InteractionController;
use super::graph::{GraphModel, build_graph_model};
use super::physics::{LayoutConfig, Simulation};
use super::scene::{RenderBackend, RenderScene, SurfaceError, SurfaceRegistry};

/// Canvas extent assumed for the radial ring until the first frame reports
/// the real one.
const FALLBACK_CANVAS_EXTENT: f32 = 300.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(super) enum Slot {
    Local,
    Global,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum SlotState {
    Closed,
    Rendering,
    Open,
}

/// Per-instance frame schedule. A stopped loop never runs again; a paused
/// one skips frames until resumed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(super) struct FrameLoop {
    stopped: bool,
    paused: bool,
    frames: u64,
}

impl FrameLoop {
    pub(super) fn is_scheduled(&self) -> bool {
        !self.stopped && !self.paused
    }

    pub(super) fn frames(&self) -> u64 {
        self.frames
    }

    /// Called at the top of every frame; `true` when the frame should advance.
    pub(super) fn tick(&mut self) -> bool {
        if !self.is_scheduled() {
            return false;
        }
        self.frames += 1;
        true
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn resume(&mut self) {
        self.paused = false;
    }

    fn stop(&mut self) {
        self.stopped = true;
    }
}

/// Model, layout, scene and input state of one open graph view.
pub(super) struct GraphInstance {
    pub(super) model: GraphModel,
    pub(super) simulation: Simulation,
    pub(super) scene: RenderScene,
    pub(super) controller: InteractionController,
    pub(super) frame_loop: FrameLoop,
    pub(super) config: GraphConfig,
}

pub(super) fn radial_radius(config: &GraphConfig, width: f32, height: f32) -> Option<f32> {
    config
        .enable_radial
        .then(|| width.min(height) / 2.0 * 0.8)
}

struct SlotEntry {
    state: SlotState,
    focus: Option<String>,
    instance: Option<GraphInstance>,
}

impl SlotEntry {
    fn closed() -> Self {
        Self {
            state: SlotState::Closed,
            focus: None,
            instance: None,
        }
    }
}

/// Owns the local and global graph views. Every (re)open tears down the
/// previous instance of the slot first.
pub(super) struct SessionLifecycle {
    config: ViewerConfig,
    registry: SurfaceRegistry,
    local: SlotEntry,
    global: SlotEntry,
}

impl SessionLifecycle {
    pub(super) fn new(config: ViewerConfig, backend: RenderBackend) -> Self {
        Self {
            config,
            registry: SurfaceRegistry::new(backend),
            local: SlotEntry::closed(),
            global: SlotEntry::closed(),
        }
    }

    fn entry(&self, slot: Slot) -> &SlotEntry {
        match slot {
            Slot::Local => &self.local,
            Slot::Global => &self.global,
        }
    }

    fn entry_mut(&mut self, slot: Slot) -> &mut SlotEntry {
        match slot {
            Slot::Local => &mut self.local,
            Slot::Global => &mut self.global,
        }
    }

    fn graph_config(&self, slot: Slot) -> &GraphConfig {
        match slot {
            Slot::Local => &self.config.local,
            Slot::Global => &self.config.global,
        }
    }

    pub(super) fn backend(&self) -> RenderBackend {
        self.registry.backend()
    }

    pub(super) fn state(&self, slot: Slot) -> SlotState {
        self.entry(slot).state
    }

    pub(super) fn is_open(&self, slot: Slot) -> bool {
        self.state(slot) == SlotState::Open
    }

    pub(super) fn focus(&self, slot: Slot) -> Option<&str> {
        self.entry(slot).focus.as_deref()
    }

    pub(super) fn instance_mut(&mut self, slot: Slot) -> Option<&mut GraphInstance> {
        self.entry_mut(slot).instance.as_mut()
    }

    pub(super) fn instance(&self, slot: Slot) -> Option<&GraphInstance> {
        self.entry(slot).instance.as_ref()
    }

    /// Slots whose frame loop would run on the next frame.
    pub(super) fn scheduled_frames(&self) -> Vec<Slot> {
        [Slot::Local, Slot::Global]
            .into_iter()
            .filter(|slot| {
                self.instance(*slot)
                    .is_some_and(|instance| instance.frame_loop.is_scheduled())
            })
            .collect()
    }

    pub(super) fn open(
        &mut self,
        slot: Slot,
        index: &ContentIndex,
        focus: &str,
    ) -> Result<(), SurfaceError> {
        self.teardown(slot);

        let focus = normalize(focus);
        let config = self.graph_config(slot).clone();
        let base_path = self.config.base_path.clone();
        {
            let entry = self.entry_mut(slot);
            entry.state = SlotState::Rendering;
            entry.focus = Some(focus.clone());
        }

        let model = build_graph_model(index, &focus, &config);
        if model.is_empty() {
            warn!(?slot, %focus, "graph model is empty, nothing to render");
            self.entry_mut(slot).state = SlotState::Open;
            self.sync_local_schedule();
            return Ok(());
        }

        let lease = match self.registry.lease(slot) {
            Ok(lease) => lease,
            Err(error) => {
                self.entry_mut(slot).state = SlotState::Closed;
                return Err(error);
            }
        };

        let simulation = Simulation::start(
            &model,
            LayoutConfig {
                repel_force: config.repel_force,
                center_force: config.center_force,
                link_distance: config.link_distance,
                radial_radius: radial_radius(
                    &config,
                    FALLBACK_CANVAS_EXTENT,
                    FALLBACK_CANVAS_EXTENT,
                ),
            },
        );
        let scene = RenderScene::new(&model, Some(lease));
        let controller = InteractionController::new(&config, &base_path);

        info!(
            ?slot,
            %focus,
            nodes = model.nodes.len(),
            edges = model.edges.len(),
            "graph opened"
        );

        let entry = self.entry_mut(slot);
        entry.instance = Some(GraphInstance {
            model,
            simulation,
            scene,
            controller,
            frame_loop: FrameLoop::default(),
            config,
        });
        entry.state = SlotState::Open;
        self.sync_local_schedule();
        Ok(())
    }

    pub(super) fn close(&mut self, slot: Slot) {
        self.teardown(slot);
        let entry = self.entry_mut(slot);
        entry.state = SlotState::Closed;
        entry.focus = None;
        self.sync_local_schedule();
    }

    pub(super) fn toggle_global(
        &mut self,
        index: &ContentIndex,
        focus: &str,
    ) -> Result<(), SurfaceError> {
        if self.state(Slot::Global) == SlotState::Closed {
            self.open(Slot::Global, index, focus)
        } else {
            self.close(Slot::Global);
            Ok(())
        }
    }

    /// Re-renders every open slot around the focus it already had.
    pub(super) fn theme_changed(&mut self, index: &ContentIndex) -> Result<(), SurfaceError> {
        for slot in [Slot::Local, Slot::Global] {
            if !self.is_open(slot) {
                continue;
            }
            let Some(focus) = self.focus(slot).map(str::to_owned) else {
                continue;
            };
            debug!(?slot, %focus, "re-rendering after theme change");
            self.open(slot, index, &focus)?;
        }
        Ok(())
    }

    /// Leaving the page: both views go away and the local view is rebuilt
    /// around the new page.
    pub(super) fn navigate(&mut self, index: &ContentIndex, focus: &str) -> Result<(), SurfaceError> {
        self.close(Slot::Global);
        self.close(Slot::Local);
        self.open(Slot::Local, index, focus)
    }

    pub(super) fn close_all(&mut self) {
        self.close(Slot::Global);
        self.close(Slot::Local);
    }

    fn teardown(&mut self, slot: Slot) {
        let Some(mut instance) = self.entry_mut(slot).instance.take() else {
            return;
        };
        instance.frame_loop.stop();
        instance.simulation.stop();
        if let Some(lease) = instance.scene.release() {
            self.registry.release(lease);
        }
        debug!(?slot, frames = instance.frame_loop.frames(), "graph torn down");
    }

    fn sync_local_schedule(&mut self) {
        let global_open = self.global.state != SlotState::Closed;
        if let Some(local) = self.local.instance.as_mut() {
            if global_open {
                local.frame_loop.pause();
            } else {
                local.frame_loop.resume();
            }
        }
    }

    #[cfg(test)]
    fn leased_surfaces(&self) -> usize {
        self.registry.leased_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> ContentIndex {
        ContentIndex::parse(
            r#"{
                "a": {"title": "A", "links": ["b"], "tags": ["rust"]},
                "b": {"title": "B", "links": ["c"]},
                "c": {"title": "C"},
                "d": {"title": "D"}
            }"#,
        )
        .unwrap()
    }

    fn session() -> SessionLifecycle {
        SessionLifecycle::new(ViewerConfig::defaults(), RenderBackend::Immediate)
    }

    #[test]
    fn global_view_pauses_the_local_loop_and_releases_on_close() {
        let index = index();
        let mut session = session();
        session.open(Slot::Local, &index, "a").unwrap();
        assert_eq!(session.scheduled_frames(), vec![Slot::Local]);

        session.toggle_global(&index, "a").unwrap();
        assert!(session.is_open(Slot::Global));
        assert_eq!(session.scheduled_frames(), vec![Slot::Global]);
        assert_eq!(session.leased_surfaces(), 2);
        let local = session.instance_mut(Slot::Local).unwrap();
        assert!(!local.frame_loop.tick());

        session.toggle_global(&index, "a").unwrap();
        assert_eq!(session.state(Slot::Global), SlotState::Closed);
        assert!(session.instance(Slot::Global).is_none());
        assert_eq!(session.leased_surfaces(), 1);
        assert_eq!(session.scheduled_frames(), vec![Slot::Local]);
    }

    #[test]
    fn reopening_replaces_the_previous_instance() {
        let index = index();
        let mut session = session();
        session.open(Slot::Local, &index, "a").unwrap();
        session.instance_mut(Slot::Local).unwrap().frame_loop.tick();

        session.open(Slot::Local, &index, "b").unwrap();
        let instance = session.instance(Slot::Local).unwrap();
        assert_eq!(instance.model.focus, "b");
        assert_eq!(instance.frame_loop.frames(), 0);
        assert_eq!(session.leased_surfaces(), 1);
    }

    #[test]
    fn global_view_covers_the_corpus() {
        let index = index();
        let mut session = session();
        session.open(Slot::Global, &index, "a").unwrap();
        let instance = session.instance(Slot::Global).unwrap();
        assert_eq!(instance.model.nodes.len(), 5);
        assert!(instance.simulation.config().radial_radius.is_some());
    }

    #[test]
    fn theme_change_rerenders_open_slots_with_the_same_focus() {
        let index = index();
        let mut session = session();
        session.open(Slot::Local, &index, "b").unwrap();
        session.instance_mut(Slot::Local).unwrap().frame_loop.tick();

        session.theme_changed(&index).unwrap();
        assert_eq!(session.focus(Slot::Local), Some("b"));
        assert_eq!(session.instance(Slot::Local).unwrap().frame_loop.frames(), 0);
        assert_eq!(session.state(Slot::Global), SlotState::Closed);
        assert_eq!(session.leased_surfaces(), 1);
    }

    #[test]
    fn navigation_closes_global_and_refocuses_local() {
        let index = index();
        let mut session = session();
        session.open(Slot::Local, &index, "a").unwrap();
        session.open(Slot::Global, &index, "a").unwrap();

        session.navigate(&index, "c/").unwrap();
        assert_eq!(session.state(Slot::Global), SlotState::Closed);
        assert_eq!(session.focus(Slot::Local), Some("c"));
        assert_eq!(session.scheduled_frames(), vec![Slot::Local]);
        assert_eq!(session.leased_surfaces(), 1);
    }

    #[test]
    fn empty_index_opens_without_an_instance() {
        let mut session = session();
        session.open(Slot::Local, &ContentIndex::default(), "a").unwrap();
        assert!(session.is_open(Slot::Local));
        assert!(session.instance(Slot::Local).is_none());
        assert!(session.scheduled_frames().is_empty());
        assert_eq!(session.leased_surfaces(), 0);
    }

    #[test]
    fn close_all_leaves_nothing_scheduled() {
        let index = index();
        let mut session = session();
        session.open(Slot::Local, &index, "a").unwrap();
        session.open(Slot::Global, &index, "a").unwrap();
        session.close_all();
        assert!(session.scheduled_frames().is_empty());
        assert_eq!(session.leased_surfaces(), 0);
    }

    #[test]
    fn stopped_loops_never_tick() {
        let mut frame_loop = FrameLoop::default();
        assert!(frame_loop.tick());
        frame_loop.pause();
        assert!(!frame_loop.tick());
        frame_loop.resume();
        frame_loop.stop();
        assert!(!frame_loop.tick());
        assert_eq!(frame_loop.frames(), 1);
    }
}
