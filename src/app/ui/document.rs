use eframe::egui::{self, Context, RichText, Ui};

use crate::content::slug::{is_tag, navigation_href, tag_name};

use super::super::{Viewer, ViewerAction};

impl Viewer {
    pub(in crate::app) fn draw_document(&mut self, ctx: &Context, actions: &mut Vec<ViewerAction>) {
        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    if is_tag(&self.current) {
                        self.draw_tag_listing(ui, actions);
                    } else {
                        self.draw_page(ui, actions);
                    }
                });
        });
    }

    fn link_row(&self, ui: &mut Ui, id: &str, actions: &mut Vec<ViewerAction>) {
        let known = self.index.contains(id) || is_tag(id);
        let text = if is_tag(id) {
            format!("#{}", tag_name(id))
        } else {
            self.index.title_of(id).to_owned()
        };
        let mut label = RichText::new(text);
        if self.visited.contains(id) {
            label = label.italics();
        }

        let response = ui.add_enabled(known, egui::Link::new(label));
        if response.on_hover_text(id).clicked() {
            actions.push(ViewerAction::Navigate(navigation_href(id, &self.base_path)));
        }
    }

    fn draw_page(&self, ui: &mut Ui, actions: &mut Vec<ViewerAction>) {
        let Some(entry) = self.index.get(&self.current) else {
            ui.heading(self.current.as_str());
            ui.label("This page is not part of the content index.");
            return;
        };

        ui.heading(self.index.title_of(&self.current));
        ui.small(self.current.as_str());

        if !entry.tags.is_empty() {
            ui.add_space(4.0);
            ui.horizontal_wrapped(|ui| {
                for tag in &entry.tags {
                    self.link_row(ui, tag, actions);
                }
            });
        }

        ui.separator();
        ui.label(RichText::new(format!("Links ({})", entry.links.len())).strong());
        if entry.links.is_empty() {
            ui.weak("No outgoing links.");
        }
        for link in &entry.links {
            self.link_row(ui, link, actions);
        }

        ui.add_space(8.0);
        let backlinks = self.index.backlinks(&self.current);
        ui.label(RichText::new(format!("Backlinks ({})", backlinks.len())).strong());
        if backlinks.is_empty() {
            ui.weak("Nothing links here yet.");
        }
        for source in backlinks {
            self.link_row(ui, source, actions);
        }
    }

    fn draw_tag_listing(&self, ui: &mut Ui, actions: &mut Vec<ViewerAction>) {
        ui.heading(format!("#{}", tag_name(&self.current)));
        let tagged = self.index.tagged(&self.current);
        ui.label(format!("{} page(s) with this tag", tagged.len()));
        ui.separator();
        for id in tagged {
            self.link_row(ui, id, actions);
        }
    }
}
