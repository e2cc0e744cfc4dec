//! Scripted stand-ins for processes, tool lookup and the filesystem

use crate::session::{SessionEvent, StatusSink};
use crate::status::{ConversionStatus, ItemId};
use shared_utils::filesystem::{FileSystem, LocalFileSystem};
use shared_utils::process_runner::{ProcessOutcome, ProcessRunner};
use shared_utils::tools::ToolLocator;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub struct Call {
    pub tool: String,
    pub args: Vec<String>,
}

type Hook = Box<dyn Fn(&str, &[String]) + Send + Sync>;

/// Pretends to be every encoder and decoder. A successful call writes its
/// output file so sizes and cleanup can be checked on disk.
pub struct ScriptedRunner {
    calls: Mutex<Vec<Call>>,
    failures: Mutex<HashMap<String, usize>>,
    output_sizes: HashMap<String, usize>,
    hook: Option<Hook>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
            output_sizes: HashMap::new(),
            hook: None,
        }
    }

    /// The next `times` calls to `tool` exit 1.
    pub fn fail_times(self, tool: &str, times: usize) -> Self {
        self.failures.lock().unwrap().insert(tool.to_string(), times);
        self
    }

    pub fn fail_always(self, tool: &str) -> Self {
        self.fail_times(tool, usize::MAX)
    }

    /// Bytes written for an output file with this file name.
    pub fn output_size(mut self, file_name: &str, size: usize) -> Self {
        self.output_sizes.insert(file_name.to_string(), size);
        self
    }

    /// Runs inside every call, before the call completes.
    pub fn on_call(mut self, hook: impl Fn(&str, &[String]) + Send + Sync + 'static) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn tools_called(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.tool).collect()
    }

    fn should_fail(&self, tool: &str) -> bool {
        let mut failures = self.failures.lock().unwrap();
        match failures.get_mut(tool) {
            Some(0) | None => false,
            Some(n) => {
                *n = n.saturating_sub(1);
                true
            }
        }
    }
}

fn output_arg<'a>(tool: &str, args: &'a [String]) -> Option<&'a String> {
    let after = |flag: &str| {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
    };
    match tool {
        "oxipng" => after("--out"),
        "pngquant" => after("--output"),
        "cjpeg" => after("-outfile"),
        "gifsicle" | "cwebp" | "dwebp" => after("-o"),
        "avifenc" => args.last(),
        _ => args.get(1),
    }
}

impl ProcessRunner for ScriptedRunner {
    fn run(&self, program: &Path, args: &[String]) -> io::Result<ProcessOutcome> {
        let tool = program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.calls.lock().unwrap().push(Call {
            tool: tool.clone(),
            args: args.to_vec(),
        });
        if let Some(hook) = &self.hook {
            hook(&tool, args);
        }

        if self.should_fail(&tool) {
            return Ok(ProcessOutcome {
                exit_code: Some(1),
                stderr: format!("{}: scripted failure", tool),
            });
        }

        if let Some(out) = output_arg(&tool, args) {
            let out = PathBuf::from(out);
            let name = out
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let size = self.output_sizes.get(&name).copied().unwrap_or(7);
            fs::write(&out, vec![b'x'; size])?;
        }
        Ok(ProcessOutcome {
            exit_code: Some(0),
            stderr: String::new(),
        })
    }
}

/// Every tool resolves to `/fake/bin/<name>` unless listed as missing.
pub struct FakeLocator {
    missing: HashSet<String>,
}

impl FakeLocator {
    pub fn all() -> Self {
        Self {
            missing: HashSet::new(),
        }
    }

    pub fn without(tools: &[&str]) -> Self {
        Self {
            missing: tools.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl ToolLocator for FakeLocator {
    fn locate(&self, tool: &str) -> Option<PathBuf> {
        (!self.missing.contains(tool)).then(|| PathBuf::from("/fake/bin").join(tool))
    }
}

/// Real disk, with chosen paths refused and free space overridable.
#[derive(Default)]
pub struct RestrictedFs {
    pub unreadable: HashSet<PathBuf>,
    pub unwritable_dirs: HashSet<PathBuf>,
    pub free_space: Option<u64>,
}

impl FileSystem for RestrictedFs {
    fn exists(&self, path: &Path) -> bool {
        LocalFileSystem.exists(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        LocalFileSystem.is_dir(path)
    }

    fn is_readable(&self, path: &Path) -> bool {
        !self.unreadable.contains(path) && LocalFileSystem.is_readable(path)
    }

    fn is_dir_writable(&self, dir: &Path) -> bool {
        !self.unwritable_dirs.contains(dir) && LocalFileSystem.is_dir_writable(dir)
    }

    fn file_size(&self, path: &Path) -> Option<u64> {
        LocalFileSystem.file_size(path)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        LocalFileSystem.remove_file(path)
    }

    fn free_space(&self, path: &Path) -> Option<u64> {
        self.free_space.or_else(|| LocalFileSystem.free_space(path))
    }
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SessionEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<SessionEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Every status `id` was moved to, in order.
    pub fn statuses_of(&self, id: ItemId) -> Vec<ConversionStatus> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SessionEvent::ItemStatus { id: i, status, .. } if i == id => Some(status),
                _ => None,
            })
            .collect()
    }
}

impl StatusSink for RecordingSink {
    fn on_event(&self, event: &SessionEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
