use std::path::{Path, PathBuf};

/// khamake invocation options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    /// Project directory.
    pub from: PathBuf,
    /// Output directory.
    pub to: PathBuf,
    pub project_file: String,
    pub target: String,
    pub graphics: String,
    pub visual_studio: String,
    /// Kha checkout; `make.js` is looked up here.
    pub kha: PathBuf,
    pub haxe: Option<PathBuf>,
    pub krafix: Option<PathBuf>,
    pub ffmpeg: Option<String>,
    pub ogg: Option<String>,
    pub aac: Option<String>,
    pub mp3: Option<String>,
    pub h264: Option<String>,
    pub webm: Option<String>,
    pub wmv: Option<String>,
    pub theora: Option<String>,
    pub name: String,
    pub debug: bool,
    pub silent: bool,
    /// Keep rebuilding on file changes after the initial build.
    pub watch: bool,
}

impl BuildOptions {
    /// Options for building the project in `cwd` for Krom into `cwd/build`.
    pub fn for_krom(cwd: &Path, kha: &Path, ffmpeg: Option<String>) -> Self {
        Self {
            from: cwd.to_path_buf(),
            to: cwd.join("build"),
            project_file: "khafile.js".to_owned(),
            target: "krom".to_owned(),
            graphics: "direct3d9".to_owned(),
            visual_studio: "vs2015".to_owned(),
            kha: kha.to_path_buf(),
            haxe: None,
            krafix: None,
            ffmpeg,
            ogg: None,
            aac: None,
            mp3: None,
            h264: None,
            webm: None,
            wmv: None,
            theora: None,
            name: "Project".to_owned(),
            debug: false,
            silent: false,
            watch: true,
        }
    }

    /// Path of Kha's `make.js` entry point.
    pub fn make_script(&self) -> PathBuf {
        self.kha.join("make.js")
    }

    /// Command-line arguments for `make.js`. `watch` is passed separately
    /// because the initial build always runs without it.
    pub fn to_args(&self, watch: bool) -> Vec<String> {
        let mut args = vec![
            self.target.clone(),
            "--from".to_owned(),
            self.from.display().to_string(),
            "--to".to_owned(),
            self.to.display().to_string(),
            "--projectfile".to_owned(),
            self.project_file.clone(),
            "--graphics".to_owned(),
            self.graphics.clone(),
            "--visualstudio".to_owned(),
            self.visual_studio.clone(),
            "--name".to_owned(),
            self.name.clone(),
        ];

        let paths = [("--haxe", &self.haxe), ("--krafix", &self.krafix)];
        for (flag, value) in paths {
            if let Some(value) = value {
                args.push(flag.to_owned());
                args.push(value.display().to_string());
            }
        }

        let tools = [
            ("--ffmpeg", &self.ffmpeg),
            ("--ogg", &self.ogg),
            ("--aac", &self.aac),
            ("--mp3", &self.mp3),
            ("--h264", &self.h264),
            ("--webm", &self.webm),
            ("--wmv", &self.wmv),
            ("--theora", &self.theora),
        ];
        for (flag, value) in tools {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                args.push(flag.to_owned());
                args.push(value.to_owned());
            }
        }

        if self.debug {
            args.push("--debug".to_owned());
        }
        if self.silent {
            args.push("--silent".to_owned());
        }
        if watch {
            args.push("--watch".to_owned());
        }
        args
    }
}
