//! End-to-end checks over the response-to-visualization pipeline:
//! parse → typed output → charts, timeline, scene and export.

use std::sync::Arc;

use approx::assert_relative_eq;
use forge_core::{
    Block, EnergyRequirement, ModelParams, PropulsionPhase, ResourceKind, ResourceTracker,
    SceneGraph, Shape, Span, Timeline, export_glb, format, parse_response, project_energy,
    project_speed, render_html,
};
use proptest::prelude::*;

const RESPONSE: &str = r###"{
  "inventionText": "## Aneutronic Lattice Sail\nA resonant sail that rides a torsion wake.\n### Key Features & Principles\n* **Resonant torus** tuned to cyclotron frequency\n* Metamaterial lining\n### Technical Description\nThe sail couples to the **torsion field** directly.",
  "chartData": {
    "propulsionPhases": [
      { "phase": "Launch", "time_days": 0, "speed_c": 0 },
      { "phase": "Boost", "time_days": 45, "speed_c": 0.4 },
      { "phase": "Cruise", "time_days": 400, "speed_c": 0.82 },
      { "phase": "Deceleration", "time_days": 1200, "speed_c": 0.1 }
    ],
    "energyRequirements": [
      { "speed_c": 0.5, "energy_j": 3.2e22 },
      { "speed_c": 0.8, "energy_j": 4.5e23 },
      { "speed_c": 0.99, "energy_j": 1e24 }
    ]
  },
  "imagePrompt": "photorealistic concept art of a lattice sail in deep space",
  "modelParams": {
    "components": [
      { "shape": "cylinder", "scale": [1, 4, 1], "position": [0, 0, 0], "rotation": [1.5708, 0, 0] },
      { "shape": "sphere", "scale": [1.2, 1.2, 1.2], "position": [0, 0, 2.5], "rotation": [0, 0, 0] },
      { "shape": "cone", "scale": [1, 1.5, 1], "position": [0, 0, -2.5], "rotation": [-1.5708, 0, 0] }
    ],
    "primaryColor": "#C0C0C0",
    "secondaryColor": "#00ffff"
  },
  "stabilityPercentage": 92.5
}"###;

fn phase(name: &str, time_days: f64, speed_c: f64) -> PropulsionPhase {
    PropulsionPhase {
        phase: name.to_string(),
        time_days,
        speed_c,
    }
}

/// Test 1: a full response drives every visual encoding.
#[test]
fn response_feeds_every_view() {
    let output = parse_response(RESPONSE).unwrap().into_output(None);
    assert_eq!(output.title(), "Aneutronic Lattice Sail");
    assert_eq!(output.file_stem(), "Aneutronic_Lattice_Sail");
    assert_eq!(output.stability_percentage, Some(92.5));

    let blocks: Vec<Block> = format(&output.text).collect();
    assert!(matches!(&blocks[0], Block::Heading { level: 2, .. }));
    let Block::List(items) = &blocks[3] else {
        panic!("expected a feature list, got {:?}", blocks[3]);
    };
    assert_eq!(items[0][0], Span::Strong("Resonant torus".into()));
    let html = render_html(format(&output.text));
    assert!(html.contains("<strong class=\"accent\">torsion field</strong>"));

    let speed = project_speed(output.propulsion_phases()).unwrap();
    assert_eq!(speed.points.len(), 4);
    assert_relative_eq!(speed.y.max, 0.87, epsilon = 1e-9);

    let energy = project_energy(output.energy_requirements()).unwrap();
    assert_eq!(energy.bars.len(), 3);
    assert!(energy.rejected.is_empty());

    let timeline = Timeline::new(output.propulsion_phases()).unwrap();
    assert_relative_eq!(timeline.total_time, 1200.0);
    assert_relative_eq!(timeline.phases[2].position, 400.0 / 1200.0 * 100.0);

    let tracker = ResourceTracker::new();
    let scene = SceneGraph::build(output.model_params.as_ref().unwrap(), &tracker);
    assert_eq!(scene.nodes.len(), 3);
    let glb = export_glb(&scene).unwrap();
    assert_eq!(&glb[0..4], b"glTF");
    scene.dispose();
    assert_eq!(tracker.total_live(), 0);
}

/// Test 2: empty arrays give no chart and no timeline.
#[test]
fn empty_arrays_render_nothing() {
    assert!(project_speed(&[]).is_none());
    assert!(project_energy(&[]).is_none());
    assert!(Timeline::new(&[]).is_none());
}

/// Test 3: a single phase charts but has no timeline.
#[test]
fn single_phase_has_no_timeline() {
    let phases = [phase("Launch", 0.0, 0.0)];
    assert!(Timeline::new(&phases).is_none());
    assert!(project_speed(&phases).is_some());
}

/// Test 4: extreme energy plots, zero energy is rejected rather than -inf.
#[test]
fn energy_extremes() {
    let chart = project_energy(&[
        EnergyRequirement {
            speed_c: 0.99,
            energy_j: 1e24,
        },
        EnergyRequirement {
            speed_c: 0.5,
            energy_j: 0.0,
        },
    ])
    .unwrap();
    assert_eq!(chart.bars.len(), 1);
    assert_eq!(chart.rejected, vec![1]);
    assert!(chart.y.fraction(1e24).is_finite());
    assert!(chart.to_svg().contains("1e+24"));
}

/// Test 5: the first component takes the primary material for any count 1..=7.
#[test]
fn material_assignment_by_count() {
    for n in 1..=7 {
        let params = ModelParams {
            components: (0..n)
                .map(|i| forge_core::Component {
                    shape: [Shape::Box, Shape::Sphere, Shape::Cylinder, Shape::Cone][i % 4],
                    scale: [1.0; 3],
                    position: [i as f64, 0.0, 0.0],
                    rotation: [0.0; 3],
                })
                .collect(),
            primary_color: "#333".into(),
            secondary_color: "#eee".into(),
        };
        let tracker = ResourceTracker::new();
        let scene = SceneGraph::build(&params, &tracker);
        assert_eq!(scene.nodes.len(), n);
        assert!(Arc::ptr_eq(&scene.nodes[0].material, &scene.primary));
        assert!(
            scene.nodes[1..]
                .iter()
                .all(|node| Arc::ptr_eq(&node.material, &scene.secondary))
        );
        assert_eq!(tracker.live(ResourceKind::Material), 2);
    }
}

fn rerender(text: &str) -> String {
    format(text)
        .map(|b| b.to_markdown())
        .collect::<Vec<_>>()
        .join("\n")
}

fn word() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z]{1,8}",
        "[a-z]{1,8}".prop_map(|w| format!("**{w}**")),
    ]
}

fn line() -> impl Strategy<Value = String> {
    (
        prop_oneof![Just(""), Just("* "), Just("## "), Just("### ")],
        prop::collection::vec(word(), 1..6),
    )
        .prop_map(|(prefix, words)| format!("{prefix}{}", words.join(" ")))
}

proptest! {
    /// Zero or negative total time places every phase at 0 with no NaN.
    #[test]
    fn zero_total_time_positions(
        phases in prop::collection::vec((-500.0f64..=0.0, 0.0f64..1.0), 2..8)
    ) {
        let phases: Vec<_> = phases
            .iter()
            .enumerate()
            .map(|(i, &(t, s))| phase(&format!("P{i}"), t, s))
            .collect();
        let timeline = Timeline::new(&phases).unwrap();
        for placed in &timeline.phases {
            prop_assert_eq!(placed.position, 0.0);
        }
        let animated = timeline.animated();
        prop_assert!(animated.cycle_secs.is_finite());
        prop_assert!(animated.keyframes.iter().all(|k| k.position == 0.0 && k.opacity.is_finite()));
    }

    /// Positions always land in [0, 100].
    #[test]
    fn positions_clamped(
        phases in prop::collection::vec((-100.0f64..1000.0, -1.0f64..2.0), 2..10)
    ) {
        let phases: Vec<_> = phases
            .iter()
            .map(|&(t, s)| phase("P", t, s))
            .collect();
        let timeline = Timeline::new(&phases).unwrap();
        prop_assert!(timeline.phases.iter().all(|p| (0.0..=100.0).contains(&p.position)));
        prop_assert!(timeline.max_speed >= 0.0);
    }

    /// Rendering then re-parsing reaches a fixed point after one pass.
    #[test]
    fn formatter_idempotent(lines in prop::collection::vec(line(), 0..12)) {
        let once = rerender(&lines.join("\n"));
        let twice = rerender(&once);
        prop_assert_eq!(once, twice);
    }
}
