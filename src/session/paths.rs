use std::path::{Component, Path, PathBuf};

/// Mapping between frontend (absolute) source paths and the paths the engine uses,
/// which are relative to the game root directory and always use `/`.
#[derive(Debug, Clone, Default)]
pub struct PathResolver {
    workspace: PathBuf,
    root_dir: Option<PathBuf>,
}

fn norm_separators(s: &str) -> String {
    s.replace('\\', "/")
}

/// Lexically resolve `.` and `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other),
        }
    }
    out
}

/// `path` expressed relative to `base`, both absolute and normalized.
fn relative_to(path: &Path, base: &Path) -> PathBuf {
    let path_parts = path.components().collect::<Vec<_>>();
    let base_parts = base.components().collect::<Vec<_>>();
    let common = path_parts
        .iter()
        .zip(&base_parts)
        .take_while(|(a, b)| a == b)
        .count();
    if common == 0 {
        return path.to_path_buf();
    }

    let mut out = PathBuf::new();
    for _ in common..base_parts.len() {
        out.push("..");
    }
    for part in &path_parts[common..] {
        out.push(part);
    }
    out
}

impl PathResolver {
    pub fn new(workspace: &Path, root_dir: Option<&str>) -> Self {
        Self {
            workspace: normalize(Path::new(&norm_separators(&workspace.to_string_lossy()))),
            root_dir: root_dir
                .filter(|dir| !dir.is_empty())
                .map(|dir| normalize(Path::new(&norm_separators(dir)))),
        }
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    /// Engine path of a frontend source path.
    pub fn to_remote(&self, client_path: &str) -> String {
        let path = normalize(Path::new(&norm_separators(client_path)));
        let relative = match &self.root_dir {
            Some(root) => {
                let absolute = normalize(&self.workspace.join(&path));
                relative_to(&absolute, &normalize(&self.workspace.join(root)))
            }
            None => path
                .strip_prefix(&self.workspace)
                .map(Path::to_path_buf)
                .unwrap_or(path),
        };
        norm_separators(&relative.to_string_lossy())
    }

    /// Frontend path of an engine file: workspace, then root dir, then the file.
    pub fn to_client(&self, remote_file: &str) -> PathBuf {
        let mut path = self.workspace.clone();
        if let Some(root) = &self.root_dir {
            path.push(root);
        }
        path.push(norm_separators(remote_file));
        normalize(&path)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_to_remote() {
        struct TestCase {
            root_dir: Option<&'static str>,
            client: &'static str,
            expected: &'static str,
        }
        let test_cases = vec![
            TestCase {
                root_dir: None,
                client: "/ws/scripts/main.cs",
                expected: "scripts/main.cs",
            },
            TestCase {
                root_dir: Some(""),
                client: "/ws/main.cs",
                expected: "main.cs",
            },
            TestCase {
                root_dir: None,
                client: "/other/main.cs",
                expected: "/other/main.cs",
            },
            TestCase {
                root_dir: Some("game"),
                client: "/ws/game/scripts/main.cs",
                expected: "scripts/main.cs",
            },
            TestCase {
                root_dir: Some("./game/"),
                client: "/ws\\game\\scripts\\main.cs",
                expected: "scripts/main.cs",
            },
            TestCase {
                root_dir: Some("game"),
                client: "/ws/tools/build.cs",
                expected: "../tools/build.cs",
            },
            TestCase {
                root_dir: Some("/ws/game"),
                client: "/ws/game/a/../b.cs",
                expected: "b.cs",
            },
        ];

        for tc in test_cases {
            let resolver = PathResolver::new(Path::new("/ws"), tc.root_dir);
            assert_eq!(resolver.to_remote(tc.client), tc.expected, "{}", tc.client);
        }
    }

    #[test]
    fn test_to_client() {
        let resolver = PathResolver::new(Path::new("/ws"), Some("game"));
        assert_eq!(
            resolver.to_client("scripts/main.cs"),
            PathBuf::from("/ws/game/scripts/main.cs")
        );

        let resolver = PathResolver::new(Path::new("/ws/"), None);
        assert_eq!(resolver.to_client("main.cs"), PathBuf::from("/ws/main.cs"));
        assert_eq!(resolver.workspace(), Path::new("/ws"));
    }

    #[test]
    fn test_round_trip_through_client() {
        let resolver = PathResolver::new(Path::new("/ws"), Some("game"));
        let client = resolver.to_client("core/main.cs");
        assert_eq!(resolver.to_remote(&client.to_string_lossy()), "core/main.cs");
    }
}
