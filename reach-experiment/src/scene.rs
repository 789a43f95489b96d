//! Scene update adapter: turns trial state into the element list the
//! presentation backend composites each frame.

use reach_cache::LabelId;
use reach_core::scene::palette;
use reach_core::{Color, Element, Point, Region, Scene};

/// Width of the ring shown around home while a hold is running
const HOLD_CUE_WIDTH: f32 = 10.0;

/// Everything visible during one trial frame
#[derive(Debug, Clone)]
pub struct TrialView<'a> {
    pub home: Region,
    pub target: Region,
    /// Edge length of the decoration drawn on the target
    pub decoration: Option<f32>,
    pub hold_cue: bool,
    pub path: &'a [Point],
    pub path_color: Color,
    pub path_width: f32,
    pub agent: Option<Point>,
    pub agent_radius: f32,
    pub progress: Option<(LabelId, Point)>,
}

pub fn compose_trial(view: &TrialView<'_>) -> Scene {
    let mut scene = Scene::default();

    scene.push(Element::Circle {
        center: view.target.center,
        radius: view.target.radius,
        fill: Some(palette::REGION_FILL),
        stroke: Some((palette::REGION_STROKE, 4.0)),
    });
    if let Some(size) = view.decoration {
        scene.push(Element::Decoration {
            center: view.target.center,
            size,
        });
    }

    scene.push(Element::Circle {
        center: view.home.center,
        radius: view.home.radius,
        fill: Some(palette::REGION_FILL),
        stroke: Some((palette::REGION_STROKE, 4.0)),
    });
    if view.hold_cue {
        scene.push(Element::Circle {
            center: view.home.center,
            radius: view.home.radius + HOLD_CUE_WIDTH,
            fill: None,
            stroke: Some((palette::HOLD_CUE, HOLD_CUE_WIDTH)),
        });
    }

    if view.path.len() > 1 && view.path_width > 0.0 {
        scene.push(Element::Path {
            points: view.path.to_vec(),
            color: view.path_color,
            width: view.path_width,
        });
    }

    if let Some(center) = view.agent {
        scene.push(Element::Circle {
            center,
            radius: view.agent_radius,
            fill: Some(palette::AGENT),
            stroke: None,
        });
    }

    if let Some((label, position)) = view.progress {
        scene.push(Element::Text { label, position });
    }

    scene
}

/// A screen showing only a centred text label
pub fn compose_message(label: LabelId) -> Scene {
    let mut scene = Scene::default();
    scene.push(Element::Text {
        label,
        position: (0.0, 0.0),
    });
    scene
}

#[cfg(test)]
mod tests {
    use super::*;
    use reach_cache::intern_label;

    fn view(path: &[Point]) -> TrialView<'_> {
        TrialView {
            home: Region::new((0.0, 0.0), 100.0),
            target: Region::new((700.0, 0.0), 100.0),
            decoration: None,
            hold_cue: false,
            path,
            path_color: palette::PATH_NEUTRAL,
            path_width: 25.0,
            agent: None,
            agent_radius: 20.0,
            progress: None,
        }
    }

    #[test]
    fn idle_frame_has_target_and_home() {
        let scene = compose_trial(&view(&[]));
        assert_eq!(scene.len(), 2);
    }

    #[test]
    fn hold_cue_adds_a_ring_around_home() {
        let mut v = view(&[]);
        v.hold_cue = true;
        let scene = compose_trial(&v);
        assert!(scene.iter().any(|e| matches!(
            e,
            Element::Circle { stroke: Some((c, _)), fill: None, .. } if *c == palette::HOLD_CUE
        )));
    }

    #[test]
    fn path_carries_points_and_colour() {
        let points = [(0.0, 0.0), (10.0, 0.0), (20.0, 5.0)];
        let mut v = view(&points);
        v.path_color = palette::CORRECT;
        let scene = compose_trial(&v);
        let path = scene
            .iter()
            .find_map(|e| match e {
                Element::Path { points, color, .. } => Some((points.clone(), *color)),
                _ => None,
            })
            .unwrap();
        assert_eq!(path.0, points.to_vec());
        assert_eq!(path.1, palette::CORRECT);
    }

    #[test]
    fn collapsed_stroke_is_not_drawn() {
        let points = [(0.0, 0.0), (10.0, 0.0)];
        let mut v = view(&points);
        v.path_width = 0.0;
        let scene = compose_trial(&v);
        assert!(!scene.iter().any(|e| matches!(e, Element::Path { .. })));
    }

    #[test]
    fn decoration_agent_and_progress_are_layered_last() {
        let label = intern_label("Trial 1/2");
        let mut v = view(&[]);
        v.decoration = Some(120.0);
        v.agent = Some((5.0, 5.0));
        v.progress = Some((label, (-800.0, 500.0)));
        let scene = compose_trial(&v);
        assert!(matches!(scene.elements[1], Element::Decoration { size, .. } if size == 120.0));
        assert!(matches!(scene.elements.last(), Some(Element::Text { label: l, .. }) if *l == label));
    }

    #[test]
    fn message_scene_is_a_single_label() {
        let label = intern_label("Touch the screen to start");
        let scene = compose_message(label);
        assert_eq!(scene.elements, vec![Element::Text { label, position: (0.0, 0.0) }]);
    }
}
