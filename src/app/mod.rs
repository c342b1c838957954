use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use anyhow::Result;
use eframe::egui::{self, Context};
use tracing::{error, info, warn};

use crate::config::ViewerConfig;
use crate::content::ContentIndex;
use crate::content::slug::{ROOT_SLUG, is_tag, resolve_page};
use crate::visited::VisitedStore;

mod graph;
mod physics;
mod render_utils;
mod scene;
mod search;
mod session;
mod theme;
mod ui;

use scene::RenderBackend;
use search::SearchHit;
use session::{SessionLifecycle, Slot};
use theme::ThemeMode;

/// Which drawing path the graph canvases use.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum RendererPreference {
    /// Batched shapes when a GL context is available, immediate drawing otherwise.
    #[default]
    Auto,
    Accelerated,
    Immediate,
}

#[derive(Clone, Debug)]
pub struct LaunchOptions {
    pub index_path: PathBuf,
    pub start_page: Option<String>,
    pub visited_store: Option<PathBuf>,
    pub renderer: RendererPreference,
    pub config: ViewerConfig,
}

pub struct KnowledgeGraphApp {
    options: LaunchOptions,
    backend: RenderBackend,
    state: AppState,
}

struct Loaded {
    index: ContentIndex,
    visited: VisitedStore,
}

enum AppState {
    Loading { rx: Receiver<Result<Loaded, String>> },
    Ready(Box<Viewer>),
    Error(String),
}

/// Something the user asked for while the panels were drawn; applied once
/// the frame's UI is done.
#[derive(Clone, Debug, PartialEq, Eq)]
enum ViewerAction {
    Navigate(String),
    ToggleGlobal,
    CloseGlobal,
    ToggleTheme,
}

struct Viewer {
    index: ContentIndex,
    base_path: String,
    current: String,
    visited: VisitedStore,
    session: SessionLifecycle,
    theme: ThemeMode,
    search: String,
    search_hits: Vec<SearchHit>,
    notice: Option<String>,
}

impl KnowledgeGraphApp {
    pub fn new(cc: &eframe::CreationContext<'_>, options: LaunchOptions) -> Self {
        let backend = match options.renderer {
            RendererPreference::Auto => RenderBackend::detect(cc.gl.is_some()),
            RendererPreference::Accelerated => RenderBackend::Accelerated,
            RendererPreference::Immediate => RenderBackend::Immediate,
        };
        cc.egui_ctx.set_visuals(ThemeMode::default().visuals());

        let state = Self::start_load(&options);
        Self {
            options,
            backend,
            state,
        }
    }

    fn load(index_path: PathBuf, visited_store: Option<PathBuf>) -> Result<Loaded> {
        let index = ContentIndex::load(&index_path)?;
        let visited = match visited_store.or_else(VisitedStore::default_path) {
            Some(path) => VisitedStore::open(Some(path)),
            None => {
                warn!("no data directory, visited pages are kept in memory only");
                VisitedStore::in_memory()
            }
        };
        Ok(Loaded { index, visited })
    }

    fn start_load(options: &LaunchOptions) -> AppState {
        let (tx, rx) = mpsc::channel();
        let index_path = options.index_path.clone();
        let visited_store = options.visited_store.clone();
        thread::spawn(move || {
            let result = Self::load(index_path, visited_store).map_err(|error| format!("{error:#}"));
            let _ = tx.send(result);
        });
        AppState::Loading { rx }
    }
}

impl eframe::App for KnowledgeGraphApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;

        match &mut self.state {
            AppState::Loading { rx } => {
                match rx.try_recv() {
                    Ok(Ok(loaded)) => {
                        transition = Some(AppState::Ready(Box::new(Viewer::new(
                            loaded,
                            &self.options,
                            self.backend,
                        ))));
                    }
                    Ok(Err(message)) => {
                        error!(%message, "failed to load content index");
                        transition = Some(AppState::Error(message));
                    }
                    Err(TryRecvError::Empty) => ctx.request_repaint(),
                    Err(TryRecvError::Disconnected) => {
                        transition =
                            Some(AppState::Error("Background load worker disconnected".to_owned()));
                    }
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Loading content index...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
            }
            AppState::Error(message) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load the content index");
                    ui.add_space(6.0);
                    ui.label(message.as_str());
                    ui.add_space(10.0);
                    if ui.button("Retry").clicked() {
                        transition = Some(Self::start_load(&self.options));
                    }
                });
            }
            AppState::Ready(viewer) => viewer.show(ctx),
        }

        if let Some(next_state) = transition {
            self.state = next_state;
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        if let AppState::Ready(viewer) = &mut self.state {
            viewer.session.close_all();
        }
    }
}

impl Viewer {
    fn new(loaded: Loaded, options: &LaunchOptions, backend: RenderBackend) -> Self {
        let Loaded { index, visited } = loaded;
        let base_path = options.config.base_path.clone();
        let current = Self::start_page(&index, &base_path, options.start_page.as_deref());

        let mut viewer = Self {
            session: SessionLifecycle::new(options.config.clone(), backend),
            index,
            base_path,
            current: current.clone(),
            visited,
            theme: ThemeMode::default(),
            search: String::new(),
            search_hits: Vec::new(),
            notice: None,
        };
        info!(page = %current, pages = viewer.index.len(), "viewer ready");
        viewer.visited.add(&current);
        let opened = viewer.session.open(Slot::Local, &viewer.index, &current);
        viewer.report(opened);
        viewer
    }

    /// The requested page when it resolves to a known one, else the root page,
    /// else the first page of the index.
    fn start_page(index: &ContentIndex, base_path: &str, requested: Option<&str>) -> String {
        if let Some(requested) = requested {
            let id = resolve_page(requested, base_path, index.ids());
            if index.contains(&id) || is_tag(&id) {
                return id;
            }
            warn!(requested, resolved = %id, "start page not in the index");
        }

        if index.contains(ROOT_SLUG) {
            return ROOT_SLUG.to_owned();
        }
        index
            .ids()
            .next()
            .map_or_else(|| ROOT_SLUG.to_owned(), str::to_owned)
    }

    fn report<E: std::fmt::Display>(&mut self, result: Result<(), E>) {
        if let Err(error) = result {
            error!(%error, "graph view could not be opened");
            self.notice = Some(error.to_string());
        }
    }

    fn apply(&mut self, ctx: &Context, action: ViewerAction) {
        match action {
            ViewerAction::Navigate(location) => self.navigate(&location),
            ViewerAction::ToggleGlobal => {
                let result = self.session.toggle_global(&self.index, &self.current);
                self.report(result);
            }
            ViewerAction::CloseGlobal => self.session.close(Slot::Global),
            ViewerAction::ToggleTheme => {
                self.theme = self.theme.toggled();
                ctx.set_visuals(self.theme.visuals());
                info!(theme = self.theme.label(), "theme changed");
                let result = self.session.theme_changed(&self.index);
                self.report(result);
            }
        }
    }

    /// Follows a node or link location: resolves it back to an identifier,
    /// marks it visited and rebuilds the local graph around it.
    fn navigate(&mut self, location: &str) {
        let target = resolve_page(location, &self.base_path, self.index.ids());
        info!(location, page = %target, "navigating");
        self.current = target;
        self.visited.add(&self.current);
        self.search.clear();
        self.search_hits.clear();
        self.notice = None;
        let result = self.session.navigate(&self.index, &self.current);
        self.report(result);
    }

    fn show(&mut self, ctx: &Context) {
        let mut actions = Vec::new();
        self.collect_shortcuts(ctx, &mut actions);

        self.draw_top_bar(ctx, &mut actions);
        self.draw_pages_panel(ctx, &mut actions);
        self.draw_local_graph_panel(ctx, &mut actions);
        self.draw_document(ctx, &mut actions);
        self.draw_global_overlay(ctx, &mut actions);

        for action in actions {
            self.apply(ctx, action);
        }
    }

    fn collect_shortcuts(&self, ctx: &Context, actions: &mut Vec<ViewerAction>) {
        let toggle = ctx.input_mut(|input| {
            input.consume_key(egui::Modifiers::COMMAND, egui::Key::G)
        });
        if toggle {
            actions.push(ViewerAction::ToggleGlobal);
        }

        let global_open = self.session.state(Slot::Global) != session::SlotState::Closed;
        if global_open && ctx.input(|input| input.key_pressed(egui::Key::Escape)) {
            actions.push(ViewerAction::CloseGlobal);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn loaded() -> Loaded {
        Loaded {
            index: ContentIndex::parse(
                r#"{
                    "/": {"title": "Home", "links": ["guides/intro"]},
                    "guides/intro": {"title": "Intro", "links": ["/"], "tags": ["start"]},
                    "guides/next": {"title": "Next"}
                }"#,
            )
            .unwrap(),
            visited: VisitedStore::in_memory(),
        }
    }

    fn options(start_page: Option<&str>) -> LaunchOptions {
        let mut config = ViewerConfig::defaults();
        config.base_path = "docs".to_owned();
        LaunchOptions {
            index_path: PathBuf::from("unused.json"),
            start_page: start_page.map(str::to_owned),
            visited_store: None,
            renderer: RendererPreference::Immediate,
            config,
        }
    }

    fn viewer(start_page: Option<&str>) -> Viewer {
        Viewer::new(loaded(), &options(start_page), RenderBackend::Immediate)
    }

    #[test]
    fn starts_on_the_requested_page() {
        let viewer = viewer(Some("/docs/guides/intro.html"));
        assert_eq!(viewer.current, "guides/intro");
        assert!(viewer.visited.contains("guides/intro"));
        assert_eq!(viewer.session.focus(Slot::Local), Some("guides/intro"));
    }

    #[test]
    fn unknown_start_page_falls_back_to_the_root() {
        let viewer = viewer(Some("/docs/missing.html"));
        assert_eq!(viewer.current, "/");
        assert!(viewer.session.instance(Slot::Local).is_some());
    }

    #[test]
    fn node_click_href_round_trips_through_navigation() {
        let mut viewer = viewer(None);
        let ctx = Context::default();
        viewer.apply(&ctx, ViewerAction::ToggleGlobal);
        assert!(viewer.session.is_open(Slot::Global));

        viewer.apply(&ctx, ViewerAction::Navigate("/docs/guides/next.html".to_owned()));
        assert_eq!(viewer.current, "guides/next");
        assert!(viewer.visited.contains("guides/next"));
        assert!(!viewer.session.is_open(Slot::Global));
        assert_eq!(viewer.session.focus(Slot::Local), Some("guides/next"));

        viewer.apply(&ctx, ViewerAction::Navigate("/docs/tags/start/".to_owned()));
        assert_eq!(viewer.current, "tags/start");
    }

    #[test]
    fn theme_toggle_keeps_focus() {
        let mut viewer = viewer(Some("guides/intro"));
        let ctx = Context::default();
        viewer.apply(&ctx, ViewerAction::ToggleTheme);
        assert_eq!(viewer.theme, ThemeMode::Dark);
        assert_eq!(viewer.session.focus(Slot::Local), Some("guides/intro"));
    }

    fn key_frame(key: egui::Key, modifiers: egui::Modifiers) -> egui::RawInput {
        egui::RawInput {
            screen_rect: Some(egui::Rect::from_min_size(
                egui::Pos2::ZERO,
                egui::vec2(1280.0, 840.0),
            )),
            modifiers,
            events: vec![egui::Event::Key {
                key,
                physical_key: None,
                pressed: true,
                repeat: false,
                modifiers,
            }],
            ..Default::default()
        }
    }

    fn idle_frame() -> egui::RawInput {
        egui::RawInput {
            screen_rect: Some(egui::Rect::from_min_size(
                egui::Pos2::ZERO,
                egui::vec2(1280.0, 840.0),
            )),
            ..Default::default()
        }
    }

    #[test]
    fn keyboard_toggles_and_escape_closes_the_global_graph() {
        let mut viewer = viewer(None);
        let ctx = Context::default();

        let _ = ctx.run(idle_frame(), |ctx| viewer.show(ctx));
        assert_eq!(viewer.session.state(Slot::Global), session::SlotState::Closed);

        let toggle = key_frame(egui::Key::G, egui::Modifiers::COMMAND);
        let _ = ctx.run(toggle, |ctx| viewer.show(ctx));
        assert_eq!(viewer.session.state(Slot::Global), session::SlotState::Open);
        assert!(viewer.session.scheduled_frames().contains(&Slot::Global));
        assert!(!viewer.session.scheduled_frames().contains(&Slot::Local));

        let _ = ctx.run(idle_frame(), |ctx| viewer.show(ctx));
        assert_eq!(viewer.session.state(Slot::Global), session::SlotState::Open);

        let escape = key_frame(egui::Key::Escape, egui::Modifiers::NONE);
        let _ = ctx.run(escape, |ctx| viewer.show(ctx));
        assert_eq!(viewer.session.state(Slot::Global), session::SlotState::Closed);
        assert_eq!(viewer.session.scheduled_frames(), vec![Slot::Local]);
    }

    #[test]
    fn escape_without_the_global_graph_changes_nothing() {
        let mut viewer = viewer(None);
        let ctx = Context::default();
        let escape = key_frame(egui::Key::Escape, egui::Modifiers::NONE);
        let _ = ctx.run(escape, |ctx| viewer.show(ctx));
        assert_eq!(viewer.session.state(Slot::Global), session::SlotState::Closed);
        assert_eq!(viewer.session.scheduled_frames(), vec![Slot::Local]);
    }

    #[test]
    fn loads_index_and_visited_store_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let index_path = dir.path().join("contentIndex.json");
        let mut file = std::fs::File::create(&index_path).unwrap();
        write!(file, r#"{{"a": {{"title": "A"}}}}"#).unwrap();

        let loaded =
            KnowledgeGraphApp::load(index_path, Some(dir.path().join("visited.json"))).unwrap();
        assert_eq!(loaded.index.len(), 1);
        assert_eq!(loaded.visited.len(), 0);
    }
}
