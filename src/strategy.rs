use crate::graph_parser::strip_list_marker;

/// Splits a free-text strategy into display points.
///
/// With bullet (`•`, `-`, `*`) or numbered (`1.`, `2)`) lines, each marker line
/// opens a point and the unmarked lines directly under it are joined onto it.
/// Without markers, blank-line separated paragraphs become points, or every
/// line does when there are no blank lines.
pub fn format_strategy(text: &str) -> Vec<String> {
    if text.lines().any(|line| strip_list_marker(line).is_some()) {
        list_points(text)
    } else {
        paragraph_points(text)
    }
}

fn list_points(text: &str) -> Vec<String> {
    let mut points = Vec::new();
    let mut current: Option<String> = None;
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            points.extend(current.take());
            continue;
        }
        match (strip_list_marker(line), current.as_mut()) {
            (Some(body), _) => {
                points.extend(current.take());
                current = Some(body.to_string());
            }
            (None, Some(point)) => {
                point.push(' ');
                point.push_str(line);
            }
            (None, None) => current = Some(line.to_string()),
        }
    }
    points.extend(current);
    points.retain(|p| !p.is_empty());
    points
}

fn paragraph_points(text: &str) -> Vec<String> {
    let mut blocks: Vec<Vec<&str>> = vec![Vec::new()];
    for line in text.lines().map(str::trim) {
        match (line.is_empty(), blocks.last_mut()) {
            (true, Some(block)) if !block.is_empty() => blocks.push(Vec::new()),
            (false, Some(block)) => block.push(line),
            _ => {}
        }
    }
    blocks.retain(|b| !b.is_empty());

    match blocks.as_slice() {
        [single] => single.iter().map(|l| l.to_string()).collect(),
        _ => blocks.iter().map(|b| b.join(" ")).collect(),
    }
}
