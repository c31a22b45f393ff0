//! Canned AppleScript for the convenience tools. Application names are
//! spliced in verbatim; callers own any quoting inside them.

/// Returns "Resolution: WIDTHxHEIGHT".
pub const SCREEN_RESOLUTION: &str = r#"
tell application "Finder"
    set screenBounds to bounds of window of desktop
    set screenWidth to item 3 of screenBounds
    set screenHeight to item 4 of screenBounds
    return "Resolution: " & screenWidth & "x" & screenHeight
end tell
"#;

pub const SYSTEM_INFO: &str = r#"
set computerName to computer name of (system info)
set osVersion to system version of (system info)
set totalMemory to (physical memory of (system info)) / 1024 / 1024
return "Computer: " & computerName & " macOS: " & osVersion & " Memory: " & totalMemory & "MB"
"#;

pub fn activate_app(app_name: &str) -> String {
    format!(
        r#"
tell application "{app_name}"
    activate
end tell
"#
    )
}

/// Activates the application and reports the frontmost process name, which
/// can differ from the application name System Events wants.
pub fn frontmost_process(app_name: &str) -> String {
    format!(
        r#"
tell application "{app_name}" to activate
delay 0.5
tell application "System Events"
    set frontApp to name of first application process whose frontmost is true
    return frontApp
end tell
"#
    )
}

pub fn dock_front_window(process_name: &str, x_pos: i64, width: i64, height: i64) -> String {
    format!(
        r#"
tell application "System Events"
    tell application process "{process_name}"
        set frontWindow to front window
        set position of frontWindow to {{{x_pos}, 0}}
        set size of frontWindow to {{{width}, {height}}}
    end tell
end tell
"#
    )
}

pub fn window_info(app_name: Option<&str>) -> String {
    match app_name {
        Some(app_name) => format!(
            r#"
tell application "System Events"
    tell process "{app_name}"
        tell window 1
            set windowPos to position
            set windowSize to size
            return "Position: " & item 1 of windowPos & "," & item 2 of windowPos & " Size: " & item 1 of windowSize & "x" & item 2 of windowSize
        end tell
    end tell
end tell
"#
        ),
        None => r#"
tell application "System Events"
    set frontApp to name of first application process whose frontmost is true
    tell process frontApp
        tell window 1
            set windowPos to position
            set windowSize to size
            return "App: " & frontApp & " Position: " & item 1 of windowPos & "," & item 2 of windowPos & " Size: " & item 1 of windowSize & "x" & item 2 of windowSize
        end tell
    end tell
end tell
"#
        .to_string(),
    }
}

/// Parse the output of [`SCREEN_RESOLUTION`] into (width, height).
pub fn parse_resolution(text: &str) -> Option<(i64, i64)> {
    let dimensions = text.trim().strip_prefix("Resolution: ")?;
    let (width, height) = dimensions.split_once('x')?;
    Some((width.trim().parse().ok()?, height.trim().parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_finder_resolution_output() {
        assert_eq!(parse_resolution("Resolution: 1352x878\n"), Some((1352, 878)));
    }

    #[test]
    fn rejects_malformed_resolution_output() {
        assert_eq!(parse_resolution("execution error: Finder got an error"), None);
        assert_eq!(parse_resolution("Resolution: wide"), None);
        assert_eq!(parse_resolution(""), None);
    }

    #[test]
    fn app_name_is_spliced_verbatim() {
        let script = activate_app("Safari");
        assert!(script.contains(r#"tell application "Safari""#));
    }

    #[test]
    fn window_info_has_named_and_frontmost_variants() {
        assert!(window_info(Some("Notes")).contains(r#"tell process "Notes""#));
        assert!(window_info(None).contains("frontmost is true"));
    }
}
