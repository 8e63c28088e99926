use flowroll::format_strategy;
use pretty_assertions::assert_eq;

#[test]
fn bullet_markers_are_stripped() {
    assert_eq!(
        format_strategy("• First point\n• Second point"),
        vec!["First point", "Second point"]
    );
}

#[test]
fn plain_lines_become_points() {
    let text = "Pummel for underhooks.\nCircle away from the power side.\nShoot when they square up.";
    assert_eq!(
        format_strategy(text),
        vec![
            "Pummel for underhooks.",
            "Circle away from the power side.",
            "Shoot when they square up."
        ]
    );
}

#[test]
fn mixed_markers_and_wrapped_lines() {
    let text = "Here is how to shut the guard player down:\n\n\
1. Posture up and keep elbows\n   inside the knees.\n\
2. Stand to open the guard.\n\
- Knee cut once the legs open\n\
* Settle side control\n  and crossface.";
    assert_eq!(
        format_strategy(text),
        vec![
            "Here is how to shut the guard player down:",
            "Posture up and keep elbows inside the knees.",
            "Stand to open the guard.",
            "Knee cut once the legs open",
            "Settle side control and crossface."
        ]
    );
}

#[test]
fn paragraphs_join_their_lines() {
    let text = "Control the wrists first.\nThen break grips.\n\nAttack the back when they turtle.";
    assert_eq!(
        format_strategy(text),
        vec![
            "Control the wrists first. Then break grips.",
            "Attack the back when they turtle."
        ]
    );
}

#[test]
fn numbers_without_a_separator_are_text() {
    assert_eq!(
        format_strategy("3 rounds of drilling\n2x underhooks"),
        vec!["3 rounds of drilling", "2x underhooks"]
    );
}
