use super::*;

#[test]
fn sanitize_strips_terminal_control_sequences() {
    assert_eq!(sanitize_reading("12.3V\x1b[2J"), "12.3V[2J");
    assert_eq!(sanitize_reading("range\n1.2m\r"), "range 1.2m");
    assert_eq!(sanitize_reading("  bearing\t271  "), "bearing 271");
}

#[test]
fn sanitize_keeps_markup_as_text() {
    assert_eq!(sanitize_reading("<h1>12.3V</h1>"), "<h1>12.3V</h1>");
}

#[test]
fn label_cell_starts_off_and_follows_indicator_updates() {
    let cell = AutonomyLabelCell::default();
    assert_eq!(cell.current().state, "OFF");
    assert_eq!(cell.current().button, "Switch ON");

    AutonomyIndicator::show(&cell, AutonomyLabels::for_state(true));
    assert_eq!(cell.current().state, "ON");
    assert_eq!(cell.current().button, "Switch OFF");
}
