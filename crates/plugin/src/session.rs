//! Session Mount Table: per-step, per-node, in-memory record of mounts
//! this plug-in instance has established, in establishment order. Torn
//! down in reverse, so a mount is always released before the directory it
//! lives under.

use std::path::{Path, PathBuf};

use nix::unistd::Pid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    pub mount_point: PathBuf,
    pub daemon_pid: Pid,
}

#[derive(Debug, Default)]
pub struct SessionMountTable {
    entries: Vec<MountEntry>,
}

impl SessionMountTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, mount_point: PathBuf, daemon_pid: Pid) {
        self.entries.push(MountEntry {
            mount_point,
            daemon_pid,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, mount_point: &Path) -> bool {
        self.entries.iter().any(|e| e.mount_point == mount_point)
    }

    /// Drains entries in reverse insertion order, for LIFO teardown.
    pub fn drain_reverse(&mut self) -> impl Iterator<Item = MountEntry> + '_ {
        std::iter::from_fn(move || self.entries.pop())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(mp: &str, pid: i32) -> (PathBuf, Pid) {
        (PathBuf::from(mp), Pid::from_raw(pid))
    }

    #[test]
    fn new_table_is_empty() {
        let table = SessionMountTable::new();
        assert!(table.is_empty());
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn record_appends_and_contains_finds_it() {
        let mut table = SessionMountTable::new();
        let (mp, pid) = entry("/mnt/a", 100);
        table.record(mp.clone(), pid);
        assert_eq!(table.len(), 1);
        assert!(table.contains(&mp));
        assert!(!table.contains(Path::new("/mnt/b")));
    }

    #[test]
    fn drain_reverse_yields_lifo_order() {
        let mut table = SessionMountTable::new();
        let (mp_a, pid_a) = entry("/mnt/a", 100);
        let (mp_b, pid_b) = entry("/mnt/b", 101);
        let (mp_c, pid_c) = entry("/mnt/c", 102);
        table.record(mp_a.clone(), pid_a);
        table.record(mp_b.clone(), pid_b);
        table.record(mp_c.clone(), pid_c);

        let drained: Vec<_> = table.drain_reverse().collect();
        assert_eq!(
            drained.iter().map(|e| e.mount_point.clone()).collect::<Vec<_>>(),
            vec![mp_c, mp_b, mp_a]
        );
        assert!(table.is_empty());
    }
}
