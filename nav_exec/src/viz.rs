//! # Visualisation
//!
//! Builds render-agnostic markers from an [`ObstacleView`] and hands them to a [`VizSink`].
//! How markers are transported and drawn is up to the sink.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    mpsc::Sender,
    Mutex,
};

// Internal
use crate::per::{Centroid, ObstacleView};
use util::session::Session;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Namespace of obstacle outline markers
pub const NS_OBSTACLES: &str = "obstacles";

/// Namespace of the centroids marker
pub const NS_CENTROIDS: &str = "centroids";

/// Namespace of the relevant centroids marker
pub const NS_RELEVANT: &str = "relevant_centroids";

const COLOUR_OBSTACLE: Colour = Colour::rgb(0.6, 0.6, 0.6);
const COLOUR_RELEVANT: Colour = Colour::rgb(1.0, 0.2, 0.1);
const COLOUR_CENTROID: Colour = Colour::rgb(0.1, 0.4, 1.0);

const LINE_WIDTH_M: f64 = 0.02;
const POINT_SIZE_M: f64 = 0.08;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct Colour {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct Marker {
    pub ns: &'static str,
    pub id: u32,
    pub kind: MarkerKind,

    /// Points in the map frame as `[x, y]`
    pub points_m: Vec<[f64; 2]>,

    pub colour: Colour,

    /// Line width or point size
    pub scale_m: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MarkerArray {
    pub stamp: DateTime<Utc>,
    pub markers: Vec<Marker>,
}

/// Saves every marker array as a numbered JSON file in the session directory.
pub struct SessionVizSink {
    session: Mutex<Session>,
    dir: String,
    count: AtomicUsize,
}

/// Forwards marker arrays over a channel, e.g. to a renderer thread.
pub struct ChannelVizSink {
    sender: Mutex<Sender<MarkerArray>>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum MarkerKind {
    /// Consecutive points joined by lines
    LineStrip,

    /// Unconnected points
    Points,
}

#[derive(Debug, thiserror::Error)]
pub enum VizError {
    #[error("The visualisation receiver has disconnected")]
    Disconnected,

    #[error("The visualisation sink lock is poisoned")]
    LockPoisoned,
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Somewhere markers can be published to.
pub trait VizSink: Send + Sync {
    fn publish(&self, markers: &MarkerArray) -> Result<(), VizError>;
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Colour {
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }
}

impl MarkerArray {
    pub fn find(&self, ns: &str, id: u32) -> Option<&Marker> {
        self.markers.iter().find(|m| m.ns == ns && m.id == id)
    }
}

/// Build the markers for one obstacle view.
///
/// Each obstacle gets a closed outline in the obstacle namespace, drawn in the relevant colour if
/// its centroid passed the filter. All centroids and the relevant centroids get one points marker
/// each.
pub fn build_markers(view: &ObstacleView) -> MarkerArray {
    let mut markers: Vec<Marker> = view
        .obstacles
        .iter()
        .map(|o| {
            let mut points_m: Vec<[f64; 2]> = o.points_m.iter().map(|p| [p.x, p.y]).collect();

            // Close polygons
            if points_m.len() > 2 {
                points_m.push(points_m[0]);
            }

            let relevant = view.relevant.iter().any(|c| c.obstacle_id == o.id);

            Marker {
                ns: NS_OBSTACLES,
                id: o.id,
                kind: MarkerKind::LineStrip,
                points_m,
                colour: if relevant {
                    COLOUR_RELEVANT
                } else {
                    COLOUR_OBSTACLE
                },
                scale_m: LINE_WIDTH_M,
            }
        })
        .collect();

    markers.push(points_marker(NS_CENTROIDS, &view.centroids, COLOUR_CENTROID));
    markers.push(points_marker(NS_RELEVANT, &view.relevant, COLOUR_RELEVANT));

    MarkerArray {
        stamp: view.stamp,
        markers,
    }
}

fn points_marker(ns: &'static str, centroids: &[Centroid], colour: Colour) -> Marker {
    Marker {
        ns,
        id: 0,
        kind: MarkerKind::Points,
        points_m: centroids
            .iter()
            .map(|c| [c.position_m.x, c.position_m.y])
            .collect(),
        colour,
        scale_m: POINT_SIZE_M,
    }
}

impl SessionVizSink {
    /// Markers will be saved as `{dir}/markers_{n}.json` inside the session directory.
    pub fn new(session: &Session, dir: &str) -> Self {
        Self {
            session: Mutex::new(session.clone()),
            dir: dir.to_string(),
            count: AtomicUsize::new(0),
        }
    }
}

impl VizSink for SessionVizSink {
    fn publish(&self, markers: &MarkerArray) -> Result<(), VizError> {
        let n = self.count.fetch_add(1, Ordering::Relaxed);

        self.session.lock().map_err(|_| VizError::LockPoisoned)?.save(
            format!("{}/markers_{:06}.json", self.dir, n),
            markers.clone(),
        );

        Ok(())
    }
}

impl ChannelVizSink {
    pub fn new(sender: Sender<MarkerArray>) -> Self {
        Self {
            sender: Mutex::new(sender),
        }
    }
}

impl VizSink for ChannelVizSink {
    fn publish(&self, markers: &MarkerArray) -> Result<(), VizError> {
        self.sender
            .lock()
            .map_err(|_| VizError::LockPoisoned)?
            .send(markers.clone())
            .map_err(|_| VizError::Disconnected)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::per::Obstacle;
    use nalgebra::Vector2;
    use std::sync::mpsc::channel;

    fn view() -> ObstacleView {
        let obstacles = vec![
            Obstacle {
                id: 0,
                points_m: vec![
                    Vector2::new(0.0, 0.0),
                    Vector2::new(1.0, 0.0),
                    Vector2::new(1.0, 1.0),
                ],
                velocity_ms: None,
            },
            Obstacle {
                id: 1,
                points_m: vec![Vector2::new(5.0, 5.0)],
                velocity_ms: None,
            },
        ];
        let centroids = vec![
            Centroid {
                obstacle_id: 0,
                position_m: Vector2::new(2.0 / 3.0, 1.0 / 3.0),
            },
            Centroid {
                obstacle_id: 1,
                position_m: Vector2::new(5.0, 5.0),
            },
        ];

        ObstacleView {
            stamp: Utc::now(),
            obstacles,
            relevant: vec![centroids[0]],
            centroids,
        }
    }

    #[test]
    fn test_build_markers() {
        let markers = build_markers(&view());

        assert_eq!(markers.markers.len(), 4);

        let outline = markers.find(NS_OBSTACLES, 0).unwrap();
        assert_eq!(outline.kind, MarkerKind::LineStrip);
        assert_eq!(outline.points_m.len(), 4);
        assert_eq!(outline.points_m[0], outline.points_m[3]);
        assert_eq!(outline.colour, COLOUR_RELEVANT);

        let point = markers.find(NS_OBSTACLES, 1).unwrap();
        assert_eq!(point.points_m.len(), 1);
        assert_eq!(point.colour, COLOUR_OBSTACLE);

        assert_eq!(markers.find(NS_CENTROIDS, 0).unwrap().points_m.len(), 2);
        assert_eq!(markers.find(NS_RELEVANT, 0).unwrap().points_m.len(), 1);
    }

    #[test]
    fn test_channel_sink() {
        let (tx, rx) = channel();
        let sink = ChannelVizSink::new(tx);

        sink.publish(&build_markers(&view())).unwrap();
        assert_eq!(rx.recv().unwrap().markers.len(), 4);

        drop(rx);
        assert!(matches!(
            sink.publish(&build_markers(&view())),
            Err(VizError::Disconnected)
        ));
    }

    #[test]
    fn test_session_sink() {
        let dir = tempfile::tempdir().unwrap();
        let session = Session::new_in(dir.path(), "viz_test").unwrap();

        let sink = SessionVizSink::new(&session, "viz");
        sink.publish(&build_markers(&view())).unwrap();

        let saved = session.session_root.join("viz/markers_000000.json");
        session.exit();

        let text = std::fs::read_to_string(saved).unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["markers"].as_array().unwrap().len(), 4);
    }
}
