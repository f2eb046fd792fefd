//! Breakpoint bookkeeping.
//!
//! The engine keeps its own breakpoint table and can clear or move entries on
//! its own (for example after it reloads a changed script). The adapter mirrors
//! that table so that breakpoint hits and remote notifications can be mapped
//! back to frontend breakpoint ids.

use crate::remote::RemoteCommand;
use indexmap::IndexMap;

/// Breakpoint as requested by the frontend.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceBreakpoint {
    pub line: i64,
    pub condition: Option<String>,
    pub hit_condition: Option<String>,
}

/// Breakpoint installed in the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakpointLocation {
    pub line: i64,
    pub id: i64,
    pub condition: Option<String>,
    pub hit_condition: Option<String>,
}

impl BreakpointLocation {
    fn set_command(&self, file: &str) -> RemoteCommand {
        RemoteCommand::BreakpointSet {
            file: file.to_string(),
            line: self.line,
            hit_count: hit_count(self.hit_condition.as_deref()),
            condition: self.condition.clone().filter(|c| !c.is_empty()),
        }
    }
}

/// Leading integer of a hit condition, `0` if there is none.
fn hit_count(hit_condition: Option<&str>) -> i64 {
    let Some(text) = hit_condition.map(str::trim_start) else {
        return 0;
    };
    let (sign, digits) = match text.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, text.strip_prefix('+').unwrap_or(text)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().map(|n| sign * n).unwrap_or(0)
}

/// Result of replacing the breakpoints of one file.
#[derive(Debug, Default)]
pub struct BreakpointUpdate {
    /// Engine commands in sending order, clears first.
    pub commands: Vec<RemoteCommand>,
    pub installed: Vec<BreakpointLocation>,
}

/// Breakpoints per engine-relative file path, in insertion order.
///
/// Ids are allocated from a counter that is never reset, so an id identifies
/// a breakpoint for the whole session.
#[derive(Default)]
pub struct BreakpointManager {
    next_id: i64,
    files: IndexMap<String, Vec<BreakpointLocation>>,
}

impl BreakpointManager {
    /// Replace every breakpoint of `file` with `requested`.
    pub fn replace(&mut self, file: &str, requested: &[SourceBreakpoint]) -> BreakpointUpdate {
        let mut update = BreakpointUpdate::default();

        if let Some(previous) = self.files.shift_remove(file) {
            update.commands.extend(previous.iter().map(|bp| RemoteCommand::BreakpointClear {
                file: file.to_string(),
                line: bp.line,
            }));
        }

        for bp in requested {
            let location = BreakpointLocation {
                line: bp.line,
                id: self.next_id,
                condition: bp.condition.clone(),
                hit_condition: bp.hit_condition.clone(),
            };
            self.next_id += 1;
            update.commands.push(location.set_command(file));
            update.installed.push(location);
        }

        self.files.insert(file.to_string(), update.installed.clone());
        update
    }

    /// `BRKSET` for every tracked breakpoint, used once the engine accepted the connection.
    pub fn replay(&self) -> Vec<RemoteCommand> {
        self.files
            .iter()
            .flat_map(|(file, bps)| bps.iter().map(|bp| bp.set_command(file)))
            .collect()
    }

    pub fn find(&self, file: &str, line: i64) -> Option<&BreakpointLocation> {
        self.files.get(file)?.iter().find(|bp| bp.line == line)
    }

    pub fn locations(&self, file: &str) -> &[BreakpointLocation] {
        self.files.get(file).map(Vec::as_slice).unwrap_or_default()
    }

    /// Engine dropped a breakpoint. Returns the removed entry, `None` if it was not tracked.
    pub fn remote_clear(&mut self, file: &str, line: i64) -> Option<BreakpointLocation> {
        let bps = self.files.get_mut(file)?;
        let idx = bps.iter().position(|bp| bp.line == line)?;
        Some(bps.remove(idx))
    }

    /// Engine moved a breakpoint. Returns the updated entry, `None` if it was not tracked.
    pub fn remote_move(&mut self, file: &str, line: i64, new_line: i64) -> Option<BreakpointLocation> {
        let bp = self
            .files
            .get_mut(file)?
            .iter_mut()
            .find(|bp| bp.line == line)?;
        bp.line = new_line;
        Some(bp.clone())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn at(line: i64) -> SourceBreakpoint {
        SourceBreakpoint {
            line,
            ..Default::default()
        }
    }

    #[test]
    fn test_replace_file_breakpoints() {
        let mut manager = BreakpointManager::default();
        manager.replace("a.cs", &[at(1), at(2)]);
        let update = manager.replace("a.cs", &[at(3)]);

        let lines = update.commands.iter().map(|c| c.to_string()).collect::<Vec<_>>();
        assert_eq!(
            lines,
            vec![
                "BRKCLR a.cs 1",
                "BRKCLR a.cs 2",
                "BRKSET a.cs 3 false 0 true"
            ]
        );
        let tracked = manager.locations("a.cs");
        assert_eq!(tracked.len(), 1);
        assert_eq!(tracked[0].line, 3);
    }

    #[test]
    fn test_ids_strictly_increase() {
        let mut manager = BreakpointManager::default();
        let mut ids = vec![];
        for (file, lines) in [("a.cs", vec![1, 2]), ("b.cs", vec![5]), ("a.cs", vec![1]), ("b.cs", vec![])] {
            let requested = lines.into_iter().map(at).collect::<Vec<_>>();
            ids.extend(manager.replace(file, &requested).installed.iter().map(|bp| bp.id));
        }
        assert_eq!(ids, vec![0, 1, 2, 3]);
        assert!(manager.locations("b.cs").is_empty());
    }

    #[test]
    fn test_conditions_and_hit_counts() {
        let mut manager = BreakpointManager::default();
        let update = manager.replace(
            "a.cs",
            &[
                SourceBreakpoint {
                    line: 4,
                    condition: Some("%i == 3".to_string()),
                    hit_condition: Some("10".to_string()),
                },
                SourceBreakpoint {
                    line: 8,
                    condition: Some(String::new()),
                    hit_condition: Some("abc".to_string()),
                },
            ],
        );
        let lines = update.commands.iter().map(|c| c.to_string()).collect::<Vec<_>>();
        assert_eq!(
            lines,
            vec!["BRKSET a.cs 4 false 10 %i == 3", "BRKSET a.cs 8 false 0 true"]
        );
    }

    #[test]
    fn test_hit_count() {
        assert_eq!(hit_count(None), 0);
        assert_eq!(hit_count(Some("7")), 7);
        assert_eq!(hit_count(Some(" 12 hits")), 12);
        assert_eq!(hit_count(Some("-3")), -3);
        assert_eq!(hit_count(Some(">= 5")), 0);
    }

    #[test]
    fn test_replay() {
        let mut manager = BreakpointManager::default();
        manager.replace("a.cs", &[at(1)]);
        manager.replace("dir/b.cs", &[at(2), at(3)]);
        let lines = manager.replay().iter().map(|c| c.to_string()).collect::<Vec<_>>();
        assert_eq!(
            lines,
            vec![
                "BRKSET a.cs 1 false 0 true",
                "BRKSET dir/b.cs 2 false 0 true",
                "BRKSET dir/b.cs 3 false 0 true"
            ]
        );
    }

    #[test]
    fn test_remote_notifications() {
        let mut manager = BreakpointManager::default();
        manager.replace("a.cs", &[at(10), at(20)]);

        let moved = manager.remote_move("a.cs", 10, 12).unwrap();
        assert_eq!((moved.id, moved.line), (0, 12));
        assert_eq!(manager.find("a.cs", 12).map(|bp| bp.id), Some(0));
        assert!(manager.find("a.cs", 10).is_none());

        let cleared = manager.remote_clear("a.cs", 20).unwrap();
        assert_eq!(cleared.id, 1);
        assert_eq!(manager.locations("a.cs").len(), 1);

        // untracked file or line
        assert!(manager.remote_clear("a.cs", 99).is_none());
        assert!(manager.remote_clear("other.cs", 1).is_none());
        assert!(manager.remote_move("other.cs", 1, 2).is_none());
    }
}
