use eframe::egui::{self, Align, Color32, Context, Id, Layout, Order, RichText, Sense, UiBuilder};

use super::super::graph::view::{draw_empty_graph, draw_graph, hover_caption};
use super::super::search::search_pages;
use super::super::session::{Slot, SlotState};
use super::super::{Viewer, ViewerAction};
use crate::content::slug::navigation_href;

const SEARCH_LIMIT: usize = 24;
const LOCAL_GRAPH_HEIGHT: f32 = 320.0;
const OVERLAY_FRACTION: f32 = 0.8;

fn clicked_outside(clicked: bool, pointer: Option<egui::Pos2>, container: egui::Rect) -> bool {
    clicked && pointer.is_some_and(|position| !container.contains(position))
}

impl Viewer {
    pub(in crate::app) fn draw_top_bar(&mut self, ctx: &Context, actions: &mut Vec<ViewerAction>) {
        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("linkweb");
                    ui.separator();
                    ui.label(format!("page: {}", self.current));
                    ui.label(format!("pages: {}", self.index.len()));
                    ui.label(format!("visited: {}", self.visited.len()));

                    let global_open = self.session.state(Slot::Global) != SlotState::Closed;
                    let global_label = if global_open {
                        "Close global graph"
                    } else {
                        "Global graph"
                    };
                    if ui
                        .button(global_label)
                        .on_hover_text("Ctrl+G")
                        .clicked()
                    {
                        actions.push(ViewerAction::ToggleGlobal);
                    }

                    let theme_label = format!("Theme: {}", self.theme.label());
                    if ui.button(theme_label).clicked() {
                        actions.push(ViewerAction::ToggleTheme);
                    }

                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        ui.label(format!(
                            "renderer: {} | live views: {}",
                            self.session.backend().label(),
                            self.session.scheduled_frames().len()
                        ));
                        if let Some(notice) = &self.notice {
                            ui.colored_label(Color32::from_rgb(214, 92, 72), notice.as_str());
                        }
                    });
                });
            });
    }

    pub(in crate::app) fn draw_pages_panel(&mut self, ctx: &Context, actions: &mut Vec<ViewerAction>) {
        egui::SidePanel::left("pages")
            .resizable(true)
            .default_width(260.0)
            .show(ctx, |ui| {
                ui.heading("Pages");
                ui.add_space(4.0);

                let response = ui.add(
                    egui::TextEdit::singleline(&mut self.search)
                        .hint_text("Search pages")
                        .desired_width(f32::INFINITY),
                );
                if response.changed() {
                    self.search_hits = search_pages(&self.index, &self.search, SEARCH_LIMIT);
                }
                let submitted =
                    response.lost_focus() && ui.input(|input| input.key_pressed(egui::Key::Enter));
                if submitted && let Some(first) = self.search_hits.first() {
                    actions.push(ViewerAction::Navigate(navigation_href(
                        &first.id,
                        &self.base_path,
                    )));
                }
                ui.separator();

                egui::ScrollArea::vertical()
                    .auto_shrink([false, false])
                    .show(ui, |ui| {
                        if self.search.trim().is_empty() {
                            for id in self.index.ids() {
                                let selected = id == self.current;
                                let title = self.index.title_of(id);
                                if ui.selectable_label(selected, title).clicked() && !selected {
                                    actions.push(ViewerAction::Navigate(navigation_href(
                                        id,
                                        &self.base_path,
                                    )));
                                }
                            }
                        } else if self.search_hits.is_empty() {
                            ui.weak("No matching pages.");
                        } else {
                            for hit in &self.search_hits {
                                let response = ui.selectable_label(hit.id == self.current, &hit.title);
                                if response.on_hover_text(hit.id.as_str()).clicked() {
                                    actions.push(ViewerAction::Navigate(navigation_href(
                                        &hit.id,
                                        &self.base_path,
                                    )));
                                }
                            }
                        }
                    });
            });
    }

    pub(in crate::app) fn draw_local_graph_panel(
        &mut self,
        ctx: &Context,
        actions: &mut Vec<ViewerAction>,
    ) {
        let palette = self.theme.palette();
        egui::SidePanel::right("local_graph")
            .resizable(true)
            .default_width(340.0)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("Graph view");
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        if ui.small_button("Global").on_hover_text("Ctrl+G").clicked() {
                            actions.push(ViewerAction::ToggleGlobal);
                        }
                    });
                });
                ui.add_space(4.0);

                let size = egui::vec2(ui.available_width(), LOCAL_GRAPH_HEIGHT);
                ui.allocate_ui(size, |ui| {
                    if let Some(instance) = self.session.instance_mut(Slot::Local) {
                        if let Some(target) = draw_graph(ui, instance, self.visited.get(), palette) {
                            actions.push(ViewerAction::Navigate(target.href));
                        }
                    } else if self.session.is_open(Slot::Local) {
                        draw_empty_graph(ui, palette);
                    }
                });

                ui.add_space(6.0);
                if let Some(instance) = self.session.instance(Slot::Local) {
                    ui.small(hover_caption(instance));
                }
                ui.small("Drag nodes to pin them, scroll to zoom, click to open.");
            });
    }

    /// Foreground graph of the whole corpus. Escape or a click outside the
    /// canvas closes it.
    pub(in crate::app) fn draw_global_overlay(
        &mut self,
        ctx: &Context,
        actions: &mut Vec<ViewerAction>,
    ) {
        if self.session.state(Slot::Global) == SlotState::Closed {
            return;
        }

        let palette = self.theme.palette();
        let screen = ctx.content_rect();
        let container = egui::Rect::from_center_size(screen.center(), screen.size() * OVERLAY_FRACTION);

        egui::Area::new(Id::new("global_graph_overlay"))
            .order(Order::Foreground)
            .fixed_pos(screen.min)
            .show(ctx, |ui| {
                ui.painter()
                    .rect_filled(screen, 0.0, Color32::from_black_alpha(140));
                let backdrop = ui.interact(screen, Id::new("global_graph_backdrop"), Sense::click());

                ui.scope_builder(UiBuilder::new().max_rect(container), |ui| {
                    if let Some(instance) = self.session.instance_mut(Slot::Global) {
                        if let Some(target) = draw_graph(ui, instance, self.visited.get(), palette) {
                            actions.push(ViewerAction::Navigate(target.href));
                        }
                    } else {
                        draw_empty_graph(ui, palette);
                    }
                });

                if clicked_outside(backdrop.clicked(), backdrop.interact_pointer_pos(), container) {
                    actions.push(ViewerAction::CloseGlobal);
                }
            });

        egui::Area::new(Id::new("global_graph_caption"))
            .order(Order::Tooltip)
            .fixed_pos(container.left_top() + egui::vec2(10.0, 8.0))
            .interactable(false)
            .show(ctx, |ui| {
                ui.label(RichText::new("Global graph (Esc to close)").color(palette.darkgray));
            });
    }
}
