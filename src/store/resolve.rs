// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Name resolution.
//!
//! Users refer to tracked entries loosely: `~/.bashrc`, `.bashrc`,
//! `.config/nvim`, `nvim`, or even a full absolute path. The [`Resolver`]
//! turns any of these into a [`Resolution`], the pair of the entry's path
//! inside the store and its original path under the home directory.
//!
//! Resolution never touches anything outside the store. It only looks.

use crate::{
    config::Layout,
    path::{absolutize, clean, is_within},
    store::{
        fs_err,
        walk::{entry_kind, is_excluded, StoreWalk},
        Result, StoreError,
    },
};

use std::{
    fs::symlink_metadata,
    io::ErrorKind,
    path::{Component, Path, PathBuf},
};
use tracing::{debug, instrument};

/// Tracked entry location pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Path of entry inside store.
    pub store_path: PathBuf,

    /// Path the entry is linked from.
    pub original_path: PathBuf,
}

/// Resolve user supplied names against a store.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    layout: &'a Layout,
}

impl<'a> Resolver<'a> {
    pub fn new(layout: &'a Layout) -> Self {
        Self { layout }
    }

    /// Find tracked entry for given name.
    ///
    /// Lookup order:
    ///
    /// 1. Exact position relative to home, if the name has more than one
    ///    component.
    /// 2. Base name at the top-level of the store.
    /// 3. First entry along the store walk whose base name matches.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::NotInitialized`] if the store does not exist.
    /// - Return [`StoreError::SelfReference`] if the name is an absolute path
    ///   inside the store.
    /// - Return [`StoreError::NotTracked`] if nothing matches.
    /// - Return [`StoreError::Filesystem`] if the store cannot be walked.
    #[instrument(skip(self, name), level = "debug")]
    pub fn resolve(&self, name: impl AsRef<Path>) -> Result<Resolution> {
        let name = name.as_ref();
        let store_root = self.layout.store_root();
        if !store_root.is_dir() {
            return Err(StoreError::NotInitialized {
                store_root: store_root.to_path_buf(),
            });
        }

        let cleaned = self.through_home(clean(self.layout.expand(name)));
        if cleaned.is_absolute() && is_within(&cleaned, store_root) {
            return Err(StoreError::SelfReference { path: cleaned });
        }

        let not_tracked = || StoreError::NotTracked {
            name: name.to_string_lossy().into_owned(),
        };
        let base = cleaned.file_name().ok_or_else(not_tracked)?.to_owned();

        if let Some(relative) = self.home_relative(&cleaned) {
            let original = self.layout.home().join(&relative);
            if is_within(&original, store_root) {
                return Err(StoreError::SelfReference { path: original });
            }

            if relative.components().count() > 1 {
                if let Some(found) = self.tracked_at(&relative) {
                    debug!("exact match {:?}", found.store_path.display());
                    return Ok(found);
                }
            }
        }

        if let Some(found) = self.tracked_at(Path::new(&base)) {
            debug!("top-level match {:?}", found.store_path.display());
            return Ok(found);
        }

        let found = StoreWalk::new(store_root)
            .find(|entry| match entry {
                Ok(entry) => entry.path.file_name() == Some(base.as_os_str()),
                Err(_) => true,
            })
            .transpose()?
            .ok_or_else(not_tracked)?;
        debug!("walk match {:?}", found.path.display());

        Ok(Resolution {
            original_path: self.layout.home().join(&found.relative),
            store_path: found.path,
        })
    }

    /// Determine where a new entry would be placed inside the store.
    ///
    /// Entries under the home directory keep their position relative to it,
    /// anything else is placed at the top-level of the store by base name.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::SelfReference`] if the path is inside the store,
    ///   or the store is inside the path.
    /// - Return [`StoreError::NotFound`] if the path does not exist.
    /// - Return [`StoreError::AlreadySymlink`] if the path is a symlink.
    /// - Return [`StoreError::InvalidPath`] if the path has no base name.
    #[instrument(skip(self, original), level = "debug")]
    pub fn placement(&self, original: impl AsRef<Path>) -> Result<Resolution> {
        let expanded = self.layout.expand(original);
        let original = absolutize(&expanded).map_err(fs_err("resolve", &expanded))?;
        let original = self.through_home(original);
        let store_root = self.layout.store_root();

        if is_within(&original, store_root) || is_within(store_root, &original) {
            return Err(StoreError::SelfReference { path: original });
        }

        let metadata = match symlink_metadata(&original) {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound { path: original })
            }
            Err(err) => return Err(fs_err("inspect", &original)(err)),
        };

        if metadata.file_type().is_symlink() {
            return Err(StoreError::AlreadySymlink { path: original });
        }

        let Some(base) = original.file_name() else {
            return Err(StoreError::InvalidPath { path: original });
        };

        let store_path = match original.strip_prefix(self.layout.home()) {
            Ok(relative) if !relative.as_os_str().is_empty() => store_root.join(relative),
            _ => store_root.join(base),
        };

        Ok(Resolution {
            store_path,
            original_path: original,
        })
    }

    /// Rewrite absolute path reached through the physical home directory
    /// onto the configured home path.
    ///
    /// Matters when home is a symlink, e.g., `/home` pointing at
    /// `/usr/home`, and the current directory reports the physical path.
    fn through_home(&self, path: PathBuf) -> PathBuf {
        let home = self.layout.home();
        if !path.is_absolute() || path.starts_with(home) {
            return path;
        }

        let Ok(physical) = home.canonicalize() else {
            return path;
        };

        match path.strip_prefix(&physical) {
            Ok(relative) => {
                debug!("map {:?} onto home {:?}", path.display(), home.display());
                clean(home.join(relative))
            }
            Err(_) => path,
        }
    }

    /// Path relative to home for a cleaned name, if it can be one.
    fn home_relative(&self, cleaned: &Path) -> Option<PathBuf> {
        if cleaned.is_absolute() {
            return cleaned
                .strip_prefix(self.layout.home())
                .ok()
                .filter(|relative| !relative.as_os_str().is_empty())
                .map(Path::to_path_buf);
        }

        match cleaned.components().next() {
            Some(Component::Normal(_)) => Some(cleaned.to_path_buf()),
            _ => None,
        }
    }

    /// Resolution for a tracked entry at an exact relative store position.
    fn tracked_at(&self, relative: &Path) -> Option<Resolution> {
        if is_excluded(relative) {
            return None;
        }

        let store_path = self.layout.store_root().join(relative);
        match entry_kind(&store_path) {
            Ok(Some(_)) => Some(Resolution {
                store_path,
                original_path: self.layout.home().join(relative),
            }),
            Ok(None) | Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simple_test_case::test_case;
    use std::fs::{create_dir_all, write};

    struct Fixture {
        _home: tempfile::TempDir,
        layout: Layout,
    }

    impl Fixture {
        fn new() -> anyhow::Result<Self> {
            let home = tempfile::tempdir()?;
            let layout = Layout::new(home.path());
            let root = layout.store_root();
            create_dir_all(root.join(".git"))?;
            create_dir_all(root.join(".config/nvim/lua"))?;
            create_dir_all(root.join(".config/alpha"))?;
            write(root.join(".gitignore"), "*.swp")?;
            write(root.join("README.md"), "# blah")?;
            write(root.join(".bashrc"), "# bashrc")?;
            write(root.join("hosts"), "127.0.0.1 localhost")?;
            write(root.join(".config/nvim/init.lua"), "-- init")?;
            write(root.join(".config/alpha/init.lua"), "-- alpha")?;
            write(root.join(".config/nvim/lua/plugins.lua"), "-- plugins")?;
            Ok(Self {
                _home: home,
                layout,
            })
        }

        fn home(&self) -> &Path {
            self.layout.home()
        }

        fn store(&self) -> &Path {
            self.layout.store_root()
        }
    }

    #[test_case("~/.bashrc", ".bashrc"; "tilde path")]
    #[test_case(".bashrc", ".bashrc"; "base name")]
    #[test_case(".config/nvim", ".config/nvim"; "relative path")]
    #[test_case("~/.config/nvim/", ".config/nvim"; "trailing separator")]
    #[test_case("nvim", ".config/nvim"; "nested directory by name")]
    #[test_case("plugins.lua", ".config/nvim/lua/plugins.lua"; "nested file by name")]
    #[test_case(".config/nvim/init.lua", ".config/nvim/init.lua"; "exact beats walk")]
    #[test_case("init.lua", ".config/alpha/init.lua"; "walk order decides")]
    #[test_case("hosts", "hosts"; "flat entry")]
    #[test]
    fn resolve_tracked(name: &str, relative: &str) -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        let result = Resolver::new(&fixture.layout).resolve(name)?;
        let expect = Resolution {
            store_path: fixture.store().join(relative),
            original_path: fixture.home().join(relative),
        };
        assert_eq!(result, expect);

        Ok(())
    }

    #[test]
    fn resolve_absolute_home_path() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        let name = fixture.home().join(".config/nvim/init.lua");
        let result = Resolver::new(&fixture.layout).resolve(&name)?;
        assert_eq!(result.store_path, fixture.store().join(".config/nvim/init.lua"));
        assert_eq!(result.original_path, name);

        Ok(())
    }

    #[test_case(".zshrc"; "untracked name")]
    #[test_case(".gitignore"; "ignore file")]
    #[test_case("README.md"; "readme")]
    #[test_case(".git"; "metadata dir")]
    #[test_case("HEAD"; "inside metadata dir")]
    #[test]
    fn resolve_untracked(name: &str) -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        let result = Resolver::new(&fixture.layout).resolve(name);
        assert!(matches!(result, Err(StoreError::NotTracked { .. })));

        Ok(())
    }

    #[test]
    fn resolve_rejects_store_paths() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        let name = fixture.store().join(".bashrc");
        let result = Resolver::new(&fixture.layout).resolve(name);
        assert!(matches!(result, Err(StoreError::SelfReference { .. })));

        Ok(())
    }

    #[test_case(".config/dots/.bashrc"; "relative store file")]
    #[test_case(".config/dots"; "relative store root")]
    #[test_case("./.config/dots/.config/nvim"; "dotted relative store dir")]
    #[test]
    fn resolve_rejects_relative_store_paths(name: &str) -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        let result = Resolver::new(&fixture.layout).resolve(name);
        assert!(matches!(result, Err(StoreError::SelfReference { .. })));

        Ok(())
    }

    #[test]
    fn resolve_without_store() -> anyhow::Result<()> {
        let home = tempfile::tempdir()?;
        let layout = Layout::new(home.path());
        let result = Resolver::new(&layout).resolve(".bashrc");
        assert!(matches!(result, Err(StoreError::NotInitialized { .. })));

        Ok(())
    }

    #[test]
    fn placement_mirrors_home() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        create_dir_all(fixture.home().join(".config/kitty"))?;
        let original = fixture.home().join(".config/kitty");
        let result = Resolver::new(&fixture.layout).placement(&original)?;
        let expect = Resolution {
            store_path: fixture.store().join(".config/kitty"),
            original_path: original,
        };
        assert_eq!(result, expect);

        Ok(())
    }

    #[test]
    fn placement_flattens_outside_home() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        let outside = tempfile::tempdir()?;
        let original = outside.path().join("motd");
        write(&original, "hello")?;
        let result = Resolver::new(&fixture.layout).placement(&original)?;
        assert_eq!(result.store_path, fixture.store().join("motd"));
        assert_eq!(result.original_path, clean(&original));

        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn placement_through_symlinked_home() -> anyhow::Result<()> {
        let real = tempfile::tempdir()?;
        let links = tempfile::tempdir()?;
        std::os::unix::fs::symlink(real.path(), links.path().join("home"))?;
        let layout = Layout::new(links.path().join("home"));
        create_dir_all(layout.store_root())?;

        let physical = real.path().canonicalize()?;
        create_dir_all(physical.join(".config/nvim"))?;
        let resolver = Resolver::new(&layout);

        let result = resolver.placement(physical.join(".config/nvim"))?;
        let expect = Resolution {
            store_path: layout.store_root().join(".config/nvim"),
            original_path: layout.home().join(".config/nvim"),
        };
        assert_eq!(result, expect);

        assert!(matches!(
            resolver.placement(physical.join(".config/dots")),
            Err(StoreError::SelfReference { .. })
        ));

        Ok(())
    }

    #[test]
    fn placement_checks() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        let resolver = Resolver::new(&fixture.layout);

        assert!(matches!(
            resolver.placement(fixture.store().join(".bashrc")),
            Err(StoreError::SelfReference { .. })
        ));
        assert!(matches!(
            resolver.placement(fixture.home()),
            Err(StoreError::SelfReference { .. })
        ));
        assert!(matches!(
            resolver.placement("~/.no-such-file"),
            Err(StoreError::NotFound { .. })
        ));

        #[cfg(unix)]
        {
            let link = fixture.home().join(".profile");
            std::os::unix::fs::symlink(fixture.store().join(".bashrc"), &link)?;
            assert!(matches!(
                resolver.placement(&link),
                Err(StoreError::AlreadySymlink { .. })
            ));
        }

        Ok(())
    }
}
