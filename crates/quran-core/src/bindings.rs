//! TypeScript declarations for the mobile front end.

use crate::models::{Bookmark, LastRead, Settings, SettingsPatch};
use crate::playback::PlaybackState;
use std::fs;
use std::path::Path;
use ts_rs::TS;

fn export_single_type<T: TS + 'static>(out_dir: &Path) -> Result<(), String> {
    T::export_all_to(out_dir).map_err(|err| err.to_string())
}

/// Replace every `.ts` file in `out_dir` with freshly generated declarations
/// and an `index.ts` re-exporting them.
pub fn export_ts_bindings(out_dir: &Path) -> Result<(), String> {
    fs::create_dir_all(out_dir)
        .map_err(|err| format!("Failed to create {}: {err}", out_dir.display()))?;

    for entry in fs::read_dir(out_dir)
        .map_err(|err| format!("Failed to list {}: {err}", out_dir.display()))?
    {
        let entry = entry.map_err(|err| format!("Failed to read entry: {err}"))?;
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) == Some("ts") {
            fs::remove_file(&path)
                .map_err(|err| format!("Failed to remove {}: {err}", path.display()))?;
        }
    }

    export_single_type::<Bookmark>(out_dir)?;
    export_single_type::<Settings>(out_dir)?;
    export_single_type::<SettingsPatch>(out_dir)?;
    export_single_type::<LastRead>(out_dir)?;
    export_single_type::<PlaybackState>(out_dir)?;

    let index_content = r#"export type { Bookmark } from "./Bookmark";
export type { Settings } from "./Settings";
export type { SettingsPatch } from "./SettingsPatch";
export type { LastRead } from "./LastRead";
export type { PlaybackState } from "./PlaybackState";
"#;

    let index_path = out_dir.join("index.ts");
    fs::write(&index_path, index_content)
        .map_err(|err| format!("Failed to write {}: {err}", index_path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exports_declarations_and_index() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Stale.ts"), "export type Stale = never;").unwrap();

        export_ts_bindings(dir.path()).unwrap();

        assert!(!dir.path().join("Stale.ts").exists());
        for name in ["Bookmark", "Settings", "SettingsPatch", "LastRead", "PlaybackState"] {
            assert!(dir.path().join(format!("{name}.ts")).exists(), "{name}.ts missing");
        }
        let bookmark = fs::read_to_string(dir.path().join("Bookmark.ts")).unwrap();
        assert!(bookmark.contains("surahIndex"));
        assert!(bookmark.contains("createdAt: number"));
    }
}
