use anyhow::Context;
use egui::{Align2, Color32, FontId, Pos2, Rect, Sense, Stroke, TextureHandle, Vec2};
use mapsketch::{
    core::config::Locale,
    input::KeyCode,
    BaseLayerKind, Command, DrawTool, InputEvent, LatLng, LayerTrait, Outcome, Point,
    SessionConfig, SessionController, ShapeGeometry,
};
use std::path::PathBuf;

/// Pixel distance within which a press grabs an overlay corner
const HANDLE_GRAB_PX: f32 = 10.0;

fn main() -> anyhow::Result<()> {
    mapsketch::init_logging();

    let config = match std::env::var_os("MAPSKETCH_CONFIG") {
        Some(path) => SessionConfig::from_file(&path)
            .with_context(|| format!("loading config from {:?}", path))?,
        None => SessionConfig::default(),
    };
    let (width, height) = (config.view.size.x as f32, config.view.size.y as f32);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("starting tokio runtime")?;
    let session = SessionController::with_tokio(config, runtime.handle().clone())
        .context("creating map session")?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([width + 280.0, height])
            .with_title("mapsketch"),
        ..Default::default()
    };

    eframe::run_native(
        "mapsketch-app",
        options,
        Box::new(move |_cc| Box::new(MapsketchApp::new(session, runtime))),
    )
    .map_err(|err| anyhow::anyhow!("{}", err))?;

    Ok(())
}

/// Overlay texture cached against the overlay it was decoded for
struct OverlayTexture {
    layer_id: String,
    texture: Option<TextureHandle>,
}

struct MapsketchApp {
    session: SessionController,
    // keeps background reads and searches alive for the life of the window
    _runtime: tokio::runtime::Runtime,
    image_path: String,
    geojson_path: String,
    export_dir: String,
    query: String,
    messages: Vec<String>,
    overlay_texture: Option<OverlayTexture>,
    dragging_corner: Option<usize>,
}

impl MapsketchApp {
    fn new(session: SessionController, runtime: tokio::runtime::Runtime) -> Self {
        Self {
            session,
            _runtime: runtime,
            image_path: String::new(),
            geojson_path: String::new(),
            export_dir: ".".to_string(),
            query: String::new(),
            messages: Vec::new(),
            overlay_texture: None,
            dragging_corner: None,
        }
    }

    fn locale(&self) -> Locale {
        self.session.state().config().locale
    }

    fn run(&mut self, command: Command) {
        match self.session.dispatch(command) {
            Ok(Outcome::Exported(file)) => match file.write_into(&self.export_dir) {
                Ok(path) => self.messages.push(format!("saved {}", path.display())),
                Err(err) => self.messages.push(format!("export failed: {}", err)),
            },
            Ok(_) => {}
            Err(err) => {
                log::warn!("command failed: {}", err);
                self.messages.push(err.to_string());
            }
        }
    }

    fn path_field(text: &str) -> Option<PathBuf> {
        let trimmed = text.trim();
        (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
    }

    fn controls(&mut self, ui: &mut egui::Ui) {
        let ja = self.locale() == Locale::Ja;

        ui.heading(if ja { "背景地図" } else { "Base layer" });
        let active = self.session.state().map.base_layer_kind();
        for kind in BaseLayerKind::ALL {
            if ui.selectable_label(active == Some(kind), kind.label()).clicked() {
                self.run(Command::SwitchBase(kind));
            }
        }

        ui.separator();
        ui.heading(if ja { "画像オーバーレイ" } else { "Image overlay" });
        ui.text_edit_singleline(&mut self.image_path);
        if ui.button(if ja { "画像を読み込む" } else { "Load image" }).clicked() {
            self.run(Command::SetImage(Self::path_field(&self.image_path)));
        }

        let mut opacity = self.session.state().opacity();
        ui.horizontal(|ui| {
            let slider = ui.add(egui::Slider::new(&mut opacity, 0.0..=1.0).show_value(false));
            ui.label(self.session.state().opacity_label());
            if slider.changed() {
                self.run(Command::SetOpacity(opacity));
            }
        });

        ui.horizontal(|ui| {
            if ui.button(if ja { "画像に合わせる" } else { "Fit" }).clicked() {
                self.run(Command::FitOverlay);
            }
            if ui.button(if ja { "ハンドル切替" } else { "Handles" }).clicked() {
                self.run(Command::ToggleHandles);
            }
            if ui.button(if ja { "削除" } else { "Remove" }).clicked() {
                self.run(Command::RemoveOverlay);
            }
        });

        ui.separator();
        ui.heading(if ja { "作図" } else { "Draw" });
        let current = self.session.draw_plugin().current_tool();
        ui.horizontal_wrapped(|ui| {
            if ui.selectable_label(current.is_none(), "—").clicked() {
                self.session.draw_plugin_mut().set_tool(None);
            }
            for tool in DrawTool::ALL {
                if ui.selectable_label(current == Some(tool), tool.label()).clicked() {
                    self.session.draw_plugin_mut().set_tool(Some(tool));
                }
            }
        });
        ui.label(format!("{} shapes", self.session.state().shapes().len()));
        ui.horizontal(|ui| {
            ui.label(if ja { "保存先" } else { "Export to" });
            ui.text_edit_singleline(&mut self.export_dir);
        });
        if ui.button(if ja { "GeoJSON 書き出し" } else { "Export GeoJSON" }).clicked() {
            self.run(Command::ExportShapes);
        }
        ui.text_edit_singleline(&mut self.geojson_path);
        if ui.button(if ja { "GeoJSON 読み込み" } else { "Import GeoJSON" }).clicked() {
            self.run(Command::ImportShapes(Self::path_field(&self.geojson_path)));
        }

        ui.separator();
        ui.heading(if ja { "住所検索" } else { "Search" });
        let field = ui.text_edit_singleline(&mut self.query);
        let submitted = field.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
        if ui.button(if ja { "検索" } else { "Search" }).clicked() || submitted {
            self.run(Command::Search(self.query.clone()));
        }
        if self.session.in_flight() > 0 {
            ui.spinner();
        }

        ui.separator();
        for message in self.messages.iter().rev().take(6) {
            ui.label(message);
        }
    }

    fn sync_overlay_texture(&mut self, ctx: &egui::Context) {
        let Some(overlay) = self.session.state().overlay() else {
            self.overlay_texture = None;
            return;
        };
        if matches!(&self.overlay_texture, Some(cached) if cached.layer_id == overlay.id()) {
            return;
        }

        let texture = match image::load_from_memory(overlay.source().bytes()) {
            Ok(decoded) => {
                let rgba = decoded.to_rgba8();
                let size = [rgba.width() as usize, rgba.height() as usize];
                let pixels = egui::ColorImage::from_rgba_unmultiplied(size, rgba.as_raw());
                Some(ctx.load_texture(overlay.id(), pixels, egui::TextureOptions::LINEAR))
            }
            Err(err) => {
                log::warn!("overlay image could not be decoded: {}", err);
                None
            }
        };
        self.overlay_texture = Some(OverlayTexture {
            layer_id: overlay.id().to_string(),
            texture,
        });
    }

    fn map_view(&mut self, ui: &mut egui::Ui) {
        let (response, painter) = ui.allocate_painter(ui.available_size(), Sense::click_and_drag());
        let rect = response.rect;
        self.session
            .state_mut()
            .map
            .set_size(Point::new(rect.width() as f64, rect.height() as f64));

        self.handle_pointer(ui, &response, rect);
        self.paint(&painter, rect);
    }

    fn handle_pointer(&mut self, ui: &egui::Ui, response: &egui::Response, rect: Rect) {
        let local = |pos: Pos2| Point::new((pos.x - rect.min.x) as f64, (pos.y - rect.min.y) as f64);
        let drawing = self.session.draw_plugin().current_tool().is_some();

        if let Some(pos) = response.hover_pos() {
            let _ = self.session.handle_input(&InputEvent::MouseMove {
                position: local(pos),
            });
        }

        if drawing {
            if response.double_clicked() {
                if let Some(pos) = response.interact_pointer_pos() {
                    let _ = self.session.handle_input(&InputEvent::DoubleClick {
                        position: local(pos),
                    });
                }
            } else if response.clicked() {
                if let Some(pos) = response.interact_pointer_pos() {
                    let input = InputEvent::left_click(local(pos));
                    if let Err(err) = self.session.handle_input(&input) {
                        log::warn!("draw input rejected: {}", err);
                    }
                }
            }
            for (key, code) in [
                (egui::Key::Enter, KeyCode::Enter),
                (egui::Key::Escape, KeyCode::Escape),
                (egui::Key::Backspace, KeyCode::Backspace),
            ] {
                if ui.input(|i| i.key_pressed(key)) {
                    let _ = self.session.handle_input(&InputEvent::key(code));
                }
            }
            return;
        }

        if response.drag_started() {
            self.dragging_corner = response
                .interact_pointer_pos()
                .and_then(|pos| self.corner_under(pos, rect));
        }
        if response.dragged() {
            match (self.dragging_corner, response.interact_pointer_pos()) {
                (Some(index), Some(pos)) => {
                    let position = self.session.state().map.viewport.pixel_to_lat_lng(&local(pos));
                    self.run(Command::MoveOverlayCorner { index, position });
                }
                _ => {
                    let delta = response.drag_delta();
                    self.session
                        .state_mut()
                        .map
                        .viewport
                        .pan(Point::new(-delta.x as f64, -delta.y as f64));
                }
            }
        }
        if response.drag_released() {
            self.dragging_corner = None;
        }

        if response.clicked() {
            if let Some(pos) = response.interact_pointer_pos() {
                self.click_marker(pos, rect);
            }
        }
    }

    fn screen(&self, rect: Rect, position: &LatLng) -> Pos2 {
        let pixel = self.session.state().map.viewport.lat_lng_to_pixel(position);
        rect.min + Vec2::new(pixel.x as f32, pixel.y as f32)
    }

    fn corner_under(&self, pos: Pos2, rect: Rect) -> Option<usize> {
        let overlay = self.session.state().overlay().filter(|o| o.is_editing())?;
        overlay
            .corners()
            .iter()
            .position(|corner| self.screen(rect, corner).distance(pos) <= HANDLE_GRAB_PX)
    }

    fn click_marker(&mut self, pos: Pos2, rect: Rect) {
        let hit = self
            .session
            .state()
            .search_markers()
            .into_iter()
            .find(|marker| self.screen(rect, &marker.position()).distance(pos) <= HANDLE_GRAB_PX)
            .map(|marker| marker.id().to_string());
        if let Some(id) = hit {
            self.session.state_mut().open_popup_on(&id);
        }
    }

    fn paint(&self, painter: &egui::Painter, rect: Rect) {
        let state = self.session.state();
        painter.rect_filled(rect, 0.0, Color32::from_rgb(232, 236, 228));

        if let Some(overlay) = state.overlay() {
            let corners = (*overlay.corners()).map(|c| self.screen(rect, &c));
            let tint = Color32::WHITE.gamma_multiply(overlay.opacity());
            match self.overlay_texture.as_ref().and_then(|t| t.texture.as_ref()) {
                Some(texture) => {
                    let mut mesh = egui::Mesh::with_texture(texture.id());
                    let uvs = [
                        Pos2::new(0.0, 0.0),
                        Pos2::new(1.0, 0.0),
                        Pos2::new(1.0, 1.0),
                        Pos2::new(0.0, 1.0),
                    ];
                    for (pos, uv) in corners.iter().zip(uvs) {
                        mesh.vertices.push(egui::epaint::Vertex {
                            pos: *pos,
                            uv,
                            color: tint,
                        });
                    }
                    mesh.add_triangle(0, 1, 2);
                    mesh.add_triangle(0, 2, 3);
                    painter.add(egui::Shape::mesh(mesh));
                }
                None => {
                    painter.add(egui::Shape::closed_line(
                        corners.to_vec(),
                        Stroke::new(1.0, Color32::DARK_GRAY),
                    ));
                }
            }
            if overlay.is_editing() {
                for corner in corners {
                    painter.circle(corner, 5.0, Color32::WHITE, Stroke::new(2.0, Color32::BLUE));
                }
            }
        }

        for shape in state.shapes() {
            let color = shape.style.stroke_color;
            let alpha = (shape.style.stroke_opacity.clamp(0.0, 1.0) * 255.0) as u8;
            let stroke = Stroke::new(
                shape.style.stroke_width,
                Color32::from_rgba_unmultiplied(color.r, color.g, color.b, alpha),
            );
            self.paint_geometry(painter, rect, &shape.geometry, stroke);
        }
        if let Some(preview) = self.session.draw_plugin().preview() {
            self.paint_geometry(painter, rect, &preview, Stroke::new(2.0, Color32::GRAY));
        }

        for marker in state.search_markers() {
            let pos = self.screen(rect, &marker.position());
            painter.circle(pos, 6.0, Color32::from_rgb(40, 110, 220), Stroke::new(2.0, Color32::WHITE));
            if marker.is_popup_open() {
                if let Some(text) = marker.popup_text() {
                    let galley_rect = painter.text(
                        pos - Vec2::new(0.0, 12.0),
                        Align2::CENTER_BOTTOM,
                        text,
                        FontId::proportional(14.0),
                        Color32::BLACK,
                    );
                    painter.rect_stroke(galley_rect.expand(4.0), 4.0, Stroke::new(1.0, Color32::GRAY));
                }
            }
        }

        if let Some(base) = state.map.base_layer() {
            painter.text(
                rect.right_bottom() - Vec2::new(4.0, 4.0),
                Align2::RIGHT_BOTTOM,
                base.attribution(),
                FontId::proportional(11.0),
                Color32::DARK_GRAY,
            );
        }
    }

    fn paint_geometry(&self, painter: &egui::Painter, rect: Rect, geometry: &ShapeGeometry, stroke: Stroke) {
        let to_screen = |points: &[LatLng]| -> Vec<Pos2> {
            points.iter().map(|p| self.screen(rect, p)).collect()
        };
        match geometry {
            ShapeGeometry::Marker(p) => {
                painter.circle_filled(self.screen(rect, p), 5.0, stroke.color);
            }
            ShapeGeometry::Polyline(points) => {
                painter.add(egui::Shape::line(to_screen(points), stroke));
            }
            ShapeGeometry::Polygon(rings) => {
                for ring in rings {
                    painter.add(egui::Shape::closed_line(to_screen(ring), stroke));
                }
            }
            ShapeGeometry::Rectangle(bounds) => {
                let ring = ShapeGeometry::rectangle_ring(bounds);
                painter.add(egui::Shape::closed_line(to_screen(&ring), stroke));
            }
            ShapeGeometry::Circle { center, radius } => {
                let metres_per_px = self.session.state().map.viewport.resolution();
                let radius_px = (*radius / metres_per_px) as f32;
                painter.circle_stroke(self.screen(rect, center), radius_px, stroke);
            }
        }
    }
}

impl eframe::App for MapsketchApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.session.pump() > 0 || self.session.in_flight() > 0 {
            ctx.request_repaint();
        }
        let locale = self.locale();
        for notice in self.session.take_notices() {
            self.messages.push(notice.message(locale).to_string());
        }
        self.sync_overlay_texture(ctx);

        egui::SidePanel::left("controls")
            .resizable(false)
            .exact_width(260.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| self.controls(ui));
            });

        egui::TopBottomPanel::top("status").show(ctx, |ui| {
            let (center, zoom, tile_url) = {
                let map = &self.session.state().map;
                let tile = map.viewport.center_tile();
                let url = map.base_layer().map(|base| base.tile_url(tile.z, tile.x, tile.y));
                (map.center(), map.zoom(), url)
            };
            ui.horizontal(|ui| {
                ui.label(format!("{:.4}, {:.4} | zoom {}", center.lat, center.lng, zoom));
                let step = if ui.small_button("+").clicked() {
                    1.0
                } else if ui.small_button("−").clicked() {
                    -1.0
                } else {
                    0.0
                };
                if step != 0.0 {
                    let _ = self.session.state_mut().map.set_view(center, zoom + step);
                }
                if let Some(url) = tile_url {
                    ui.separator();
                    ui.hyperlink_to("center tile", url);
                }
            });
        });

        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| self.map_view(ui));
    }
}
