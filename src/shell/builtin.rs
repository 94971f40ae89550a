use std::{env, io, path::PathBuf};

/// Change the working directory of the shell, defaulting to `$HOME`.
///
/// Returns the directory that was attempted along with the error on failure.
pub(crate) fn change_directory(target: Option<&str>) -> Result<(), (PathBuf, io::Error)> {
    let dir = match target {
        Some(dir) => PathBuf::from(dir),
        None => match env::var_os("HOME") {
            Some(home) if !home.is_empty() => PathBuf::from(home),
            _ => {
                return Err((
                    PathBuf::from("$HOME"),
                    io::Error::new(io::ErrorKind::NotFound, "HOME is not set"),
                ))
            }
        },
    };

    env::set_current_dir(&dir).map_err(|err| (dir, err))
}
