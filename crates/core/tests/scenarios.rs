use pretty_assertions::assert_eq;
use spat_control_core::{
    AutomationParameter, ControllerConfig, HostMessage, OriginOfChange, OscInput, ParameterUpdate, PlayheadInfo,
    Point, PositionSourceLink, PositionTrajectoryType, Radians, SourceIndex, SpatController, SpatMode,
};

const EPSILON: f32 = 1e-4;

fn controller(number_of_sources: usize, spat_mode: SpatMode) -> SpatController {
    SpatController::new(ControllerConfig {
        number_of_sources,
        spat_mode,
        ..ControllerConfig::default()
    })
    .unwrap()
}

/// Places every source with user moves while the sources are independent.
fn place(controller: &mut SpatController, layout: &[(f32, f32)]) {
    for (index, (degrees, radius)) in layout.iter().enumerate() {
        let position = Point::from_angle(Radians::from_degrees(*degrees), *radius);
        let origin = if index == 0 {
            OriginOfChange::UserAnchorMove
        } else {
            OriginOfChange::UserMove
        };
        assert!(controller.set_source_position(SourceIndex::new(index), position, origin));
    }
    controller.drain_host_messages();
}

fn positions(controller: &SpatController) -> Vec<Point> {
    controller.sources().iter().map(|source| source.position()).collect()
}

fn assert_close(actual: Point, expected: Point) {
    assert!(actual.distance_to(expected) < EPSILON, "{actual:?} != {expected:?}");
}

fn assert_azimuth(actual: Radians, degrees: f32) {
    let difference = (actual - Radians::from_degrees(degrees)).balanced();
    assert!(difference.as_radians().abs() < EPSILON, "{actual} != {degrees} degrees");
}

fn updates(messages: &[HostMessage]) -> Vec<ParameterUpdate> {
    messages
        .iter()
        .filter_map(|message| match message {
            HostMessage::SetValue(update) => Some(*update),
            _ => None,
        })
        .collect()
}

#[test]
fn circular_link_turns_the_whole_layout() {
    let mut controller = controller(4, SpatMode::Dome);
    place(&mut controller, &[(0.0, 0.5), (90.0, 0.5), (180.0, 0.5), (270.0, 0.5)]);
    controller.set_position_link(PositionSourceLink::Circular);

    let target = Point::from_angle(Radians::from_degrees(90.0), 0.5);
    controller.set_source_position(SourceIndex::PRIMARY, target, OriginOfChange::UserMove);

    for (index, degrees) in [(1, 180.0), (2, 270.0), (3, 0.0)] {
        let source = &controller.sources()[SourceIndex::new(index)];
        assert_azimuth(source.azimuth(), degrees);
        assert!((source.position().distance_from_origin() - 0.5).abs() < EPSILON);
    }

    let sent = updates(&controller.drain_host_messages());
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].parameter, AutomationParameter::X);
    assert!((sent[0].value - 0.75).abs() < EPSILON);
    assert!((sent[1].value - 0.5).abs() < EPSILON);
}

#[test]
fn preset_recall_under_independent_is_absolute() {
    let mut controller = controller(3, SpatMode::Dome);
    place(&mut controller, &[(0.0, 0.5), (120.0, 0.3), (240.0, 0.7)]);
    controller.set_position_link(PositionSourceLink::CircularFixedRadius);
    let rotated = Point::from_angle(Radians::from_degrees(30.0), 0.6);
    controller.set_source_position(SourceIndex::PRIMARY, rotated, OriginOfChange::UserMove);

    controller.save_preset(5).unwrap();
    let saved = positions(&controller);
    assert_eq!(controller.current_preset(), 5);

    controller.set_position_link(PositionSourceLink::Independent);
    controller.set_source_position(SourceIndex::new(1), Point::new(-0.2, 0.1), OriginOfChange::UserMove);
    controller.set_source_position(SourceIndex::new(2), Point::new(0.4, 0.4), OriginOfChange::UserMove);
    controller.set_source_position(SourceIndex::PRIMARY, Point::new(0.0, 0.0), OriginOfChange::UserMove);
    assert_eq!(controller.current_preset(), 0);

    assert!(controller.load_preset(5));

    for (actual, expected) in positions(&controller).into_iter().zip(saved) {
        assert_close(actual, expected);
    }
    assert_eq!(controller.current_preset(), 5);
    assert!(!controller.load_preset(5));
}

#[test]
fn non_finite_inputs_leave_the_layout_untouched() {
    let mut controller = controller(2, SpatMode::Cube);
    place(&mut controller, &[(10.0, 0.5), (200.0, 0.5)]);
    let before = positions(&controller);

    assert!(!controller.set_source_azimuth(SourceIndex::PRIMARY, Radians::new(f32::NAN), OriginOfChange::Automation));
    controller.parameter_changed(AutomationParameter::X, f32::NAN);
    controller.parameter_changed(AutomationParameter::Z, f32::INFINITY);
    controller.handle_osc(OscInput::PrimaryPosition { x: f32::NAN, y: 0.5 });
    assert!(!controller.set_source_position(SourceIndex::new(1), Point::new(f32::NAN, 0.0), OriginOfChange::UserMove));

    assert_eq!(positions(&controller), before);
    assert!(controller.host_messages().is_empty());
}

#[test]
fn symmetric_links_require_two_sources() {
    let mut controller = controller(3, SpatMode::Dome);
    controller.handle_osc(OscInput::PositionLink(PositionSourceLink::SymmetricX.selector()));
    assert_eq!(controller.position_link(), PositionSourceLink::Independent);

    controller.set_number_of_sources(2).unwrap();
    assert_eq!(controller.set_position_link(PositionSourceLink::SymmetricX), PositionSourceLink::SymmetricX);
    controller.set_source_position(SourceIndex::PRIMARY, Point::new(0.3, -0.4), OriginOfChange::UserMove);
    assert_close(controller.sources()[SourceIndex::new(1)].position(), Point::new(0.3, 0.4));
}

#[test]
fn adding_sources_spreads_them_under_fixed_angle() {
    let mut controller = controller(2, SpatMode::Cube);
    controller.set_source_position(
        SourceIndex::PRIMARY,
        Point::from_angle(Radians::ZERO, 0.5),
        OriginOfChange::UserAnchorMove,
    );
    controller.set_position_link(PositionSourceLink::CircularFixedAngle);

    controller.set_number_of_sources(4).unwrap();

    // Source 1 was already spread to 180. The new sources start at 45 and
    // 315, so the order from the primary is 3, 1, 2.
    assert_azimuth(controller.sources()[SourceIndex::new(3)].azimuth(), 90.0);
    assert_azimuth(controller.sources()[SourceIndex::new(1)].azimuth(), 180.0);
    assert_azimuth(controller.sources()[SourceIndex::new(2)].azimuth(), 270.0);
}

#[test]
fn trajectory_playback_drives_the_primary_and_the_host() {
    let mut controller = controller(2, SpatMode::Dome);
    place(&mut controller, &[(0.0, 0.6), (180.0, 0.6)]);
    controller.set_position_link(PositionSourceLink::Circular);
    controller.position_trajectory_mut().set_cycle_duration(4.0);
    controller.set_position_trajectory_type(PositionTrajectoryType::CircleClockwise);
    assert!(controller.set_position_activate_state(true));

    controller.process_block(PlayheadInfo::playing(10.0));
    controller.timer_callback();
    controller.process_block(PlayheadInfo::playing(11.0));
    controller.timer_callback();

    assert_azimuth(controller.sources().primary().azimuth(), 90.0);
    assert_azimuth(controller.sources()[SourceIndex::new(1)].azimuth(), 270.0);

    controller.process_block(PlayheadInfo::stopped(11.0));
    assert!(!controller.position_trajectory().is_active());

    let messages = controller.drain_host_messages();
    assert_eq!(
        messages.first(),
        Some(&HostMessage::BeginGesture {
            parameter: AutomationParameter::X
        })
    );
    assert_eq!(
        messages.last(),
        Some(&HostMessage::EndGesture {
            parameter: AutomationParameter::Y
        })
    );
    let begins = messages
        .iter()
        .filter(|message| matches!(message, HostMessage::BeginGesture { .. }))
        .count();
    assert_eq!(begins, 2);
    assert!(updates(&messages).len() >= 4);
}

#[test]
fn automation_recalls_presets_by_slot() {
    let mut controller = controller(2, SpatMode::Dome);
    place(&mut controller, &[(0.0, 0.5), (90.0, 0.5)]);
    controller.save_preset(12).unwrap();
    let saved = positions(&controller);
    controller.set_source_position(SourceIndex::new(1), Point::new(0.0, 0.2), OriginOfChange::UserMove);

    controller.parameter_changed(AutomationParameter::PositionPreset, 12.0);

    assert_eq!(controller.current_preset(), 12);
    for (actual, expected) in positions(&controller).into_iter().zip(saved) {
        assert_close(actual, expected);
    }
}
