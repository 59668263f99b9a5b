//! Virtual path resolver.
//!
//! The machine core asks for files by (category, file name). Each category is
//! routed to one of the three frontend roots:
//! - rom and image files live directly in the rom root (next to the content),
//! - per-user data (nvram, configs, screenshots...) goes under `<save>/mame2003/<sub>`,
//! - shared data files sit in `<system>/mame2003`, support folders in
//!   `<system>/mame2003/<sub>`.
//!
//! Resolving never touches the filesystem. Opening creates the directory chain
//! first; a directory that already exists is not an error.

use log::{info, warn};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Component, MAIN_SEPARATOR, Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Folder created under the save and system roots.
pub const PARENT_DIR: &str = "mame2003";

/// Longest path handed to the OS, in bytes, counting a terminator.
pub const MAX_PATH_LEN: usize = 1024;

#[derive(Debug, Error)]
pub enum PathError {
    #[error("path {} exceeds {max} bytes", path.display())]
    TooLong { path: PathBuf, max: usize },
    #[error("no route for {0:?} files")]
    MissingRoute(FileCategory),
    #[error("{0:?} files are routed twice")]
    DuplicateRoute(FileCategory),
    #[error("failed to create directory {}", path.display())]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to open {}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unsupported open mode {0:?}")]
    BadMode(String),
    #[error("file name {0:?} leaves its folder")]
    OutsideRoot(String),
}

/// Kinds of file the machine core reads or writes.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum FileCategory {
    Raw,
    Rom,
    Image,
    ImageDiff,
    Sample,
    SampleFlac,
    Artwork,
    Nvram,
    HighScore,
    HighScoreDb,
    Config,
    InputLog,
    MemoryCard,
    Screenshot,
    History,
    Cheat,
    Language,
    Controller,
    Ini,
}

impl FileCategory {
    pub const ALL: [FileCategory; 19] = [
        FileCategory::Raw,
        FileCategory::Rom,
        FileCategory::Image,
        FileCategory::ImageDiff,
        FileCategory::Sample,
        FileCategory::SampleFlac,
        FileCategory::Artwork,
        FileCategory::Nvram,
        FileCategory::HighScore,
        FileCategory::HighScoreDb,
        FileCategory::Config,
        FileCategory::InputLog,
        FileCategory::MemoryCard,
        FileCategory::Screenshot,
        FileCategory::History,
        FileCategory::Cheat,
        FileCategory::Language,
        FileCategory::Controller,
        FileCategory::Ini,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

/// Frontend-provided root a category lives under.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Root {
    System,
    Save,
    Rom,
}

/// Where one category's files go.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Route {
    pub category: FileCategory,
    pub root: Root,
    /// Folder under `<root>/mame2003`; `None` puts files in that folder itself.
    /// Ignored for the rom root, which is used as is.
    pub subfolder: Option<&'static str>,
}

const fn route(category: FileCategory, root: Root, subfolder: Option<&'static str>) -> Route {
    Route {
        category,
        root,
        subfolder,
    }
}

pub const ROUTES: &[Route] = &[
    route(FileCategory::Raw, Root::System, Some("raw")),
    route(FileCategory::Rom, Root::Rom, None),
    route(FileCategory::Image, Root::Rom, None),
    route(FileCategory::ImageDiff, Root::Save, Some("diff")),
    route(FileCategory::Sample, Root::System, Some("samples")),
    route(FileCategory::SampleFlac, Root::System, Some("samples")),
    route(FileCategory::Artwork, Root::System, Some("artwork")),
    route(FileCategory::Nvram, Root::Save, Some("nvram")),
    route(FileCategory::HighScore, Root::Save, Some("hi")),
    route(FileCategory::HighScoreDb, Root::System, None),
    route(FileCategory::Config, Root::Save, Some("cfg")),
    route(FileCategory::InputLog, Root::Save, Some("inp")),
    route(FileCategory::MemoryCard, Root::Save, Some("memcard")),
    route(FileCategory::Screenshot, Root::Save, Some("snap")),
    route(FileCategory::History, Root::System, None),
    route(FileCategory::Cheat, Root::System, None),
    route(FileCategory::Language, Root::System, Some("lang")),
    route(FileCategory::Controller, Root::System, Some("ctrlr")),
    route(FileCategory::Ini, Root::System, Some("ini")),
];

/// Check that `routes` names every category exactly once, and order it by category.
pub fn validate_routes(routes: &[Route]) -> Result<Vec<Route>, PathError> {
    let mut table: Vec<Option<Route>> = vec![None; FileCategory::ALL.len()];
    for route in routes {
        let slot = &mut table[route.category.index()];
        if slot.is_some() {
            return Err(PathError::DuplicateRoute(route.category));
        }
        *slot = Some(*route);
    }
    FileCategory::ALL
        .iter()
        .map(|&category| table[category.index()].ok_or(PathError::MissingRoute(category)))
        .collect()
}

/// The three storage roots for a session.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PathRoots {
    pub system: PathBuf,
    pub save: PathBuf,
    pub rom: PathBuf,
}

impl PathRoots {
    pub fn get(&self, root: Root) -> &Path {
        match root {
            Root::System => &self.system,
            Root::Save => &self.save,
            Root::Rom => &self.rom,
        }
    }
}

/// What [`PathResolver::path_info`] found.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PathKind {
    File,
    Directory,
    NotFound,
}

/// fopen-style access modes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OpenMode {
    /// `r`
    Read,
    /// `w`
    Write,
    /// `a`
    Append,
    /// `r+`
    ReadWrite,
    /// `w+`
    ReadWriteTruncate,
    /// `a+`
    ReadAppend,
}

impl OpenMode {
    fn options(self) -> OpenOptions {
        let mut options = OpenOptions::new();
        match self {
            OpenMode::Read => options.read(true),
            OpenMode::Write => options.write(true).create(true).truncate(true),
            OpenMode::Append => options.append(true).create(true),
            OpenMode::ReadWrite => options.read(true).write(true),
            OpenMode::ReadWriteTruncate => options.read(true).write(true).create(true).truncate(true),
            OpenMode::ReadAppend => options.read(true).append(true).create(true),
        };
        options
    }
}

impl FromStr for OpenMode {
    type Err = PathError;

    /// Accepts C `fopen` mode strings; `b` is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mode: String = s.chars().filter(|&c| c != 'b').collect();
        match mode.as_str() {
            "r" => Ok(OpenMode::Read),
            "w" => Ok(OpenMode::Write),
            "a" => Ok(OpenMode::Append),
            "r+" => Ok(OpenMode::ReadWrite),
            "w+" => Ok(OpenMode::ReadWriteTruncate),
            "a+" => Ok(OpenMode::ReadAppend),
            _ => Err(PathError::BadMode(s.to_owned())),
        }
    }
}

/// Both separators become the native one.
pub fn normalize_separators(name: &str) -> String {
    name.chars()
        .map(|c| if c == '/' || c == '\\' { MAIN_SEPARATOR } else { c })
        .collect()
}

/// Maps (category, file name) requests onto the session's roots.
#[derive(Clone, Debug)]
pub struct PathResolver {
    roots: PathRoots,
    routes: Vec<Route>,
}

impl PathResolver {
    pub fn new(roots: PathRoots) -> Result<Self, PathError> {
        Self::with_routes(roots, ROUTES)
    }

    pub fn with_routes(roots: PathRoots, routes: &[Route]) -> Result<Self, PathError> {
        let routes = validate_routes(routes)?;
        Ok(Self { roots, routes })
    }

    pub fn roots(&self) -> &PathRoots {
        &self.roots
    }

    /// Directory holding `category` files.
    pub fn directory(&self, category: FileCategory) -> PathBuf {
        let route = self.routes[category.index()];
        let root = self.roots.get(route.root);
        match (route.root, route.subfolder) {
            (Root::Rom, _) => root.to_path_buf(),
            (_, None) => root.join(PARENT_DIR),
            (_, Some(sub)) => root.join(PARENT_DIR).join(sub),
        }
    }

    /// Full path for `file_name`, without touching the filesystem.
    ///
    /// The name is relative to the category's folder; absolute names and `..`
    /// components are rejected.
    pub fn resolve(&self, category: FileCategory, file_name: &str) -> Result<PathBuf, PathError> {
        let name = normalize_separators(file_name);
        let relative = Path::new(&name)
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !relative {
            warn!("refusing {category:?} file {file_name:?} outside {}", self.directory(category).display());
            return Err(PathError::OutsideRoot(file_name.to_owned()));
        }
        check_length(self.directory(category).join(name))
    }

    pub fn path_info(&self, category: FileCategory, file_name: &str) -> PathKind {
        let Ok(path) = self.resolve(category, file_name) else {
            return PathKind::NotFound;
        };
        match fs::metadata(&path) {
            Ok(meta) if meta.is_dir() => PathKind::Directory,
            Ok(_) => PathKind::File,
            Err(_) => PathKind::NotFound,
        }
    }

    /// Open `file_name`, creating the category's directory chain first.
    pub fn open(&self, category: FileCategory, file_name: &str, mode: OpenMode) -> Result<File, PathError> {
        let path = self.resolve(category, file_name)?;
        if let Some(parent) = path.parent() {
            ensure_directory(parent)?;
        }
        info!("opening {} ({mode:?})", path.display());
        mode.options()
            .open(&path)
            .map_err(|source| PathError::Open { path, source })
    }

    /// Create `<save>/mame2003` and `<system>/mame2003`.
    pub fn init(&self) -> Result<(), PathError> {
        ensure_directory(&self.roots.save.join(PARENT_DIR))?;
        ensure_directory(&self.roots.system.join(PARENT_DIR))
    }
}

fn check_length(path: PathBuf) -> Result<PathBuf, PathError> {
    if path.as_os_str().len() + 1 > MAX_PATH_LEN {
        return Err(PathError::TooLong {
            path,
            max: MAX_PATH_LEN,
        });
    }
    Ok(path)
}

/// Create `path` and any missing parents.
pub fn ensure_directory(path: &Path) -> Result<(), PathError> {
    if path.is_dir() {
        return Ok(());
    }
    warn!("Directory {} not found - creating...", path.display());
    match fs::create_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && path.is_dir() => Ok(()),
        Err(source) => Err(PathError::CreateDirectory {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        roots: PathRoots,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let roots = PathRoots {
            system: dir.path().join("system"),
            save: dir.path().join("saves"),
            rom: dir.path().join("roms"),
        };
        Fixture { _dir: dir, roots }
    }

    #[test]
    fn categories_land_in_their_roots() {
        let fx = fixture();
        let paths = PathResolver::new(fx.roots.clone()).unwrap();

        assert_eq!(
            paths.resolve(FileCategory::Rom, "game.zip").unwrap(),
            fx.roots.rom.join("game.zip")
        );
        assert_eq!(
            paths.resolve(FileCategory::Config, "game.cfg").unwrap(),
            fx.roots.save.join("mame2003").join("cfg").join("game.cfg")
        );
        assert_eq!(
            paths.resolve(FileCategory::History, "history.dat").unwrap(),
            fx.roots.system.join("mame2003").join("history.dat")
        );
        assert_eq!(
            paths.directory(FileCategory::Sample),
            fx.roots.system.join("mame2003").join("samples")
        );
        assert_eq!(paths.directory(FileCategory::Image), fx.roots.rom);
    }

    #[test]
    fn every_category_has_one_route() {
        assert_eq!(validate_routes(ROUTES).unwrap().len(), FileCategory::ALL.len());

        let missing = &ROUTES[1..];
        assert!(matches!(
            validate_routes(missing),
            Err(PathError::MissingRoute(FileCategory::Raw))
        ));

        let mut doubled = ROUTES.to_vec();
        doubled.push(route(FileCategory::Cheat, Root::Save, None));
        assert!(matches!(
            validate_routes(&doubled),
            Err(PathError::DuplicateRoute(FileCategory::Cheat))
        ));
    }

    #[test]
    fn resolve_creates_nothing() {
        let fx = fixture();
        let paths = PathResolver::new(fx.roots.clone()).unwrap();
        paths.resolve(FileCategory::Nvram, "game.nv").unwrap();
        assert!(!fx.roots.save.exists());
        assert_eq!(paths.path_info(FileCategory::Nvram, "game.nv"), PathKind::NotFound);
    }

    #[test]
    fn open_creates_the_directory_chain() {
        let fx = fixture();
        let paths = PathResolver::new(fx.roots.clone()).unwrap();

        let mut file = paths
            .open(FileCategory::Nvram, "game.nv", "wb".parse().unwrap())
            .unwrap();
        file.write_all(b"nvram").unwrap();
        drop(file);

        assert!(fx.roots.save.join("mame2003").join("nvram").is_dir());
        assert_eq!(paths.path_info(FileCategory::Nvram, "game.nv"), PathKind::File);

        let mut contents = String::new();
        paths
            .open(FileCategory::Nvram, "game.nv", OpenMode::Read)
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, "nvram");

        // Second open with the directory already present.
        paths
            .open(FileCategory::Nvram, "other.nv", OpenMode::Write)
            .unwrap();
    }

    #[test]
    fn reading_a_missing_file_fails() {
        let fx = fixture();
        let paths = PathResolver::new(fx.roots.clone()).unwrap();
        assert!(matches!(
            paths.open(FileCategory::Cheat, "cheat.dat", OpenMode::Read),
            Err(PathError::Open { .. })
        ));
    }

    #[test]
    fn directory_creation_failure_is_reported() {
        let fx = fixture();
        fs::create_dir_all(&fx.roots.save).unwrap();
        // A plain file where the parent folder should be.
        fs::write(fx.roots.save.join("mame2003"), b"").unwrap();

        let paths = PathResolver::new(fx.roots.clone()).unwrap();
        assert!(matches!(
            paths.open(FileCategory::Config, "game.cfg", OpenMode::Write),
            Err(PathError::CreateDirectory { .. })
        ));
    }

    #[test]
    fn init_creates_both_parent_folders() {
        let fx = fixture();
        let paths = PathResolver::new(fx.roots.clone()).unwrap();
        paths.init().unwrap();
        paths.init().unwrap();
        assert!(fx.roots.save.join("mame2003").is_dir());
        assert!(fx.roots.system.join("mame2003").is_dir());
        assert_eq!(paths.path_info(FileCategory::HighScoreDb, ""), PathKind::Directory);
    }

    #[test]
    fn separators_are_normalized() {
        let fx = fixture();
        let paths = PathResolver::new(fx.roots.clone()).unwrap();
        let expected = fx.roots.system.join("mame2003").join("artwork").join("sub").join("a.png");
        assert_eq!(paths.resolve(FileCategory::Artwork, "sub/a.png").unwrap(), expected);
        assert_eq!(paths.resolve(FileCategory::Artwork, "sub\\a.png").unwrap(), expected);
    }

    #[test]
    fn names_cannot_leave_their_folder() {
        let fx = fixture();
        let paths = PathResolver::new(fx.roots.clone()).unwrap();

        for name in ["/tmp/escape.cfg", "\\tmp\\escape.cfg", "../../../outside.nv", "sub/../../x.nv"] {
            assert!(
                matches!(paths.resolve(FileCategory::Config, name), Err(PathError::OutsideRoot(_))),
                "{name} resolved"
            );
            assert!(matches!(
                paths.open(FileCategory::Config, name, OpenMode::Write),
                Err(PathError::OutsideRoot(_))
            ));
        }
        assert!(!fx.roots.save.exists(), "nothing created");
        assert_eq!(paths.path_info(FileCategory::Nvram, "../outside.nv"), PathKind::NotFound);

        assert_eq!(
            paths.resolve(FileCategory::Config, "./game.cfg").unwrap(),
            fx.roots.save.join("mame2003").join("cfg").join("game.cfg")
        );
    }

    #[test]
    fn overlong_paths_are_rejected() {
        let fx = fixture();
        let paths = PathResolver::new(fx.roots.clone()).unwrap();
        let name = "x".repeat(MAX_PATH_LEN);
        assert!(matches!(
            paths.resolve(FileCategory::Rom, &name),
            Err(PathError::TooLong { .. })
        ));
        assert_eq!(paths.path_info(FileCategory::Rom, &name), PathKind::NotFound);
    }

    #[test]
    fn fopen_modes_parse() {
        assert_eq!("rb".parse::<OpenMode>().unwrap(), OpenMode::Read);
        assert_eq!("r+b".parse::<OpenMode>().unwrap(), OpenMode::ReadWrite);
        assert_eq!("rb+".parse::<OpenMode>().unwrap(), OpenMode::ReadWrite);
        assert_eq!("a+".parse::<OpenMode>().unwrap(), OpenMode::ReadAppend);
        assert!(matches!("x".parse::<OpenMode>(), Err(PathError::BadMode(_))));
    }
}
