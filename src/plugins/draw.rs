use crate::{
    core::{
        geo::{LatLng, LatLngBounds, Point},
        viewport::Viewport,
    },
    input::events::{InputEvent, KeyCode, MouseButton},
    layers::vector::{DrawnShape, ShapeGeometry},
};

/// Pixel distance within which a click on the first vertex closes a polygon
const CLOSE_RING_TOLERANCE_PX: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawTool {
    Marker,
    Polyline,
    Polygon,
    Rectangle,
    Circle,
}

impl DrawTool {
    pub const ALL: [DrawTool; 5] = [
        DrawTool::Polyline,
        DrawTool::Polygon,
        DrawTool::Rectangle,
        DrawTool::Circle,
        DrawTool::Marker,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            DrawTool::Marker => "Marker",
            DrawTool::Polyline => "Polyline",
            DrawTool::Polygon => "Polygon",
            DrawTool::Rectangle => "Rectangle",
            DrawTool::Circle => "Circle",
        }
    }

    /// Fewest clicked vertices that make a finished shape
    fn min_vertices(&self) -> usize {
        match self {
            DrawTool::Marker => 1,
            DrawTool::Polyline | DrawTool::Rectangle | DrawTool::Circle => 2,
            DrawTool::Polygon => 3,
        }
    }
}

/// Changes the draw provider reports to the session
#[derive(Debug, Clone, PartialEq)]
pub enum DrawEvent {
    /// A finished shape. Its id is empty until the shape collection assigns one.
    Created(DrawnShape),
    /// Shapes whose geometry was edited, matched by id
    Edited(Vec<DrawnShape>),
    /// Ids of deleted shapes
    Deleted(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawState {
    Idle,
    Drawing { tool: DrawTool, points: Vec<LatLng> },
}

#[derive(Debug, Clone)]
pub struct DrawConfig {
    pub enabled: bool,
    /// Keep the tool armed after a shape is finished
    pub repeat_mode: bool,
}

impl Default for DrawConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            repeat_mode: false,
        }
    }
}

/// Interactive draw tool. Turns pointer and key input into [`DrawEvent`]s.
pub struct DrawPlugin {
    config: DrawConfig,
    state: DrawState,
    current_tool: Option<DrawTool>,
    cursor: Option<LatLng>,
}

impl DrawPlugin {
    pub fn new() -> Self {
        Self::with_config(DrawConfig::default())
    }

    pub fn with_config(config: DrawConfig) -> Self {
        Self {
            config,
            state: DrawState::Idle,
            current_tool: None,
            cursor: None,
        }
    }

    /// Arms a tool, discarding any shape in progress
    pub fn set_tool(&mut self, tool: Option<DrawTool>) {
        self.current_tool = tool;
        self.state = DrawState::Idle;
    }

    pub fn current_tool(&self) -> Option<DrawTool> {
        self.current_tool
    }

    pub fn state(&self) -> &DrawState {
        &self.state
    }

    pub fn is_drawing(&self) -> bool {
        matches!(self.state, DrawState::Drawing { .. })
    }

    pub fn config(&self) -> &DrawConfig {
        &self.config
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.config.enabled = enabled;
        if !enabled {
            self.cancel_drawing();
        }
    }

    pub fn cancel_drawing(&mut self) {
        if self.is_drawing() {
            log::debug!("drawing cancelled");
        }
        self.state = DrawState::Idle;
    }

    /// Feeds one input event; returns a `Created` event when it finishes a shape
    pub fn handle_input(&mut self, input: &InputEvent, viewport: &Viewport) -> Option<DrawEvent> {
        if !self.config.enabled {
            return None;
        }
        let tool = self.current_tool?;

        match input {
            InputEvent::Click {
                position,
                button: MouseButton::Left,
            } => self.click(tool, position, viewport),
            InputEvent::Click { .. } => None,
            InputEvent::DoubleClick { .. } => self.finish_drawing(),
            InputEvent::MouseMove { position } => {
                self.cursor = Some(viewport.pixel_to_lat_lng(position));
                None
            }
            InputEvent::KeyPress { key, .. } => match key {
                KeyCode::Enter => self.finish_drawing(),
                KeyCode::Escape => {
                    self.cancel_drawing();
                    None
                }
                KeyCode::Backspace => {
                    self.remove_last_vertex();
                    None
                }
                KeyCode::Other(_) => None,
            },
        }
    }

    fn click(&mut self, tool: DrawTool, pixel: &Point, viewport: &Viewport) -> Option<DrawEvent> {
        let position = viewport.pixel_to_lat_lng(pixel);

        if tool == DrawTool::Marker {
            return self.complete(ShapeGeometry::Marker(position));
        }

        let closes_ring = match &self.state {
            DrawState::Drawing { points, .. } if tool == DrawTool::Polygon && points.len() >= 3 => {
                let first = viewport.lat_lng_to_pixel(&points[0]);
                first.distance_to(pixel) <= CLOSE_RING_TOLERANCE_PX
            }
            _ => false,
        };
        if closes_ring {
            return self.finish_drawing();
        }

        match &mut self.state {
            DrawState::Drawing { points, .. } => {
                if points.last() != Some(&position) {
                    points.push(position);
                }
            }
            DrawState::Idle => {
                self.state = DrawState::Drawing {
                    tool,
                    points: vec![position],
                };
            }
        }

        // Two-click tools finish on their second vertex
        match tool {
            DrawTool::Rectangle | DrawTool::Circle => self.finish_drawing(),
            _ => None,
        }
    }

    fn remove_last_vertex(&mut self) {
        if let DrawState::Drawing { points, .. } = &mut self.state {
            points.pop();
            if points.is_empty() {
                self.state = DrawState::Idle;
            }
        }
    }

    /// Completes the shape in progress if it has enough vertices
    pub fn finish_drawing(&mut self) -> Option<DrawEvent> {
        let DrawState::Drawing { tool, points } = &self.state else {
            return None;
        };
        if points.len() < tool.min_vertices() {
            log::debug!(
                "{} needs {} vertices, has {}",
                tool.label(),
                tool.min_vertices(),
                points.len()
            );
            return None;
        }

        let geometry = match tool {
            DrawTool::Marker => ShapeGeometry::Marker(points[0]),
            DrawTool::Polyline => ShapeGeometry::Polyline(points.clone()),
            DrawTool::Polygon => ShapeGeometry::Polygon(vec![points.clone()]),
            DrawTool::Rectangle => {
                let bounds = LatLngBounds::from_points(points.iter().take(2))?;
                ShapeGeometry::Rectangle(bounds)
            }
            DrawTool::Circle => {
                let radius = points[0].distance_to(&points[1]);
                if radius <= 0.0 {
                    return None;
                }
                ShapeGeometry::Circle {
                    center: points[0],
                    radius,
                }
            }
        };
        self.complete(geometry)
    }

    fn complete(&mut self, geometry: ShapeGeometry) -> Option<DrawEvent> {
        log::debug!("draw created {:?}", geometry.kind());
        self.state = DrawState::Idle;
        if !self.config.repeat_mode {
            self.current_tool = None;
        }
        Some(DrawEvent::Created(DrawnShape::new(String::new(), geometry)))
    }

    /// Geometry of the shape in progress, following the cursor, for rendering
    pub fn preview(&self) -> Option<ShapeGeometry> {
        let DrawState::Drawing { tool, points } = &self.state else {
            return None;
        };
        let mut points = points.clone();
        if let Some(cursor) = self.cursor {
            points.push(cursor);
        }
        match tool {
            DrawTool::Marker => None,
            DrawTool::Polyline => Some(ShapeGeometry::Polyline(points)),
            DrawTool::Polygon => Some(ShapeGeometry::Polygon(vec![points])),
            DrawTool::Rectangle => {
                LatLngBounds::from_points(points.iter().take(2)).map(ShapeGeometry::Rectangle)
            }
            DrawTool::Circle => {
                let center = points[0];
                let radius = points.get(1).map(|p| center.distance_to(p)).unwrap_or(0.0);
                Some(ShapeGeometry::Circle { center, radius })
            }
        }
    }
}

impl Default for DrawPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::vector::ShapeKind;

    fn viewport() -> Viewport {
        Viewport::new(LatLng::new(34.8679, 138.2667), 13.0, Point::new(800.0, 600.0))
    }

    fn click(x: f64, y: f64) -> InputEvent {
        InputEvent::left_click(Point::new(x, y))
    }

    fn created_kind(event: Option<DrawEvent>) -> Option<ShapeKind> {
        match event {
            Some(DrawEvent::Created(shape)) => Some(shape.kind()),
            _ => None,
        }
    }

    #[test]
    fn test_idle_without_tool() {
        let mut plugin = DrawPlugin::new();
        assert!(plugin.handle_input(&click(10.0, 10.0), &viewport()).is_none());
        assert!(!plugin.is_drawing());
    }

    #[test]
    fn test_marker_single_click() {
        let vp = viewport();
        let mut plugin = DrawPlugin::new();
        plugin.set_tool(Some(DrawTool::Marker));
        let event = plugin.handle_input(&click(400.0, 300.0), &vp);
        match event {
            Some(DrawEvent::Created(shape)) => match shape.geometry {
                ShapeGeometry::Marker(p) => {
                    assert!((p.lat - 34.8679).abs() < 1e-6);
                    assert!((p.lng - 138.2667).abs() < 1e-6);
                }
                other => panic!("unexpected geometry {:?}", other),
            },
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(plugin.current_tool(), None);
    }

    #[test]
    fn test_polyline_needs_two_vertices() {
        let vp = viewport();
        let mut plugin = DrawPlugin::new();
        plugin.set_tool(Some(DrawTool::Polyline));
        plugin.handle_input(&click(10.0, 10.0), &vp);
        assert!(plugin
            .handle_input(&InputEvent::key(KeyCode::Enter), &vp)
            .is_none());
        plugin.handle_input(&click(50.0, 80.0), &vp);
        let event = plugin.handle_input(&InputEvent::DoubleClick {
            position: Point::new(50.0, 80.0),
        }, &vp);
        assert_eq!(created_kind(event), Some(ShapeKind::Polyline));
    }

    #[test]
    fn test_polygon_closes_on_first_vertex() {
        let vp = viewport();
        let mut plugin = DrawPlugin::new();
        plugin.set_tool(Some(DrawTool::Polygon));
        plugin.handle_input(&click(100.0, 100.0), &vp);
        plugin.handle_input(&click(200.0, 100.0), &vp);
        plugin.handle_input(&click(200.0, 200.0), &vp);
        let event = plugin.handle_input(&click(103.0, 98.0), &vp);
        match event {
            Some(DrawEvent::Created(shape)) => match shape.geometry {
                ShapeGeometry::Polygon(rings) => assert_eq!(rings[0].len(), 3),
                other => panic!("unexpected geometry {:?}", other),
            },
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_rectangle_and_circle_finish_on_second_click() {
        let vp = viewport();
        let mut plugin = DrawPlugin::with_config(DrawConfig {
            repeat_mode: true,
            ..Default::default()
        });
        plugin.set_tool(Some(DrawTool::Rectangle));
        assert!(plugin.handle_input(&click(100.0, 100.0), &vp).is_none());
        let event = plugin.handle_input(&click(300.0, 250.0), &vp);
        assert_eq!(created_kind(event), Some(ShapeKind::Rectangle));
        assert_eq!(plugin.current_tool(), Some(DrawTool::Rectangle));

        plugin.set_tool(Some(DrawTool::Circle));
        plugin.handle_input(&click(400.0, 300.0), &vp);
        let event = plugin.handle_input(&click(450.0, 300.0), &vp);
        match event {
            Some(DrawEvent::Created(shape)) => match shape.geometry {
                ShapeGeometry::Circle { radius, .. } => assert!(radius > 0.0),
                other => panic!("unexpected geometry {:?}", other),
            },
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_escape_cancels() {
        let vp = viewport();
        let mut plugin = DrawPlugin::new();
        plugin.set_tool(Some(DrawTool::Polygon));
        plugin.handle_input(&click(100.0, 100.0), &vp);
        plugin.handle_input(&click(150.0, 100.0), &vp);
        assert!(plugin.is_drawing());
        plugin.handle_input(&InputEvent::key(KeyCode::Escape), &vp);
        assert!(!plugin.is_drawing());
        assert!(plugin.preview().is_none());
    }

    #[test]
    fn test_preview_follows_cursor() {
        let vp = viewport();
        let mut plugin = DrawPlugin::new();
        plugin.set_tool(Some(DrawTool::Polyline));
        plugin.handle_input(&click(100.0, 100.0), &vp);
        plugin.handle_input(
            &InputEvent::MouseMove {
                position: Point::new(120.0, 140.0),
            },
            &vp,
        );
        match plugin.preview() {
            Some(ShapeGeometry::Polyline(points)) => assert_eq!(points.len(), 2),
            other => panic!("unexpected preview {:?}", other),
        }
    }
}
