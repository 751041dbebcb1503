//! Where each data file goes

use crate::naming::{detect_competence, normalize_name, strip_competence_suffix};
use sigtap_browser::layout::{layout_table_name, FieldLayout};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Column added to delimited tables when the competence is known
pub const COMPETENCE_COLUMN: &str = "competencia";

/// Layouts keyed by normalized table name
pub type Layouts = BTreeMap<String, Vec<FieldLayout>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// Fixed-width text described by the layout of the target table
    FixedWidth,
    /// Delimited text with a header row
    Delimited,
    /// dBase table
    Dbf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePlan {
    pub path: PathBuf,
    pub table: String,
    pub source: Source,
    pub competence: Option<String>,
}

/// Decide the target table of a data file
///
/// Returns `None` for layout files and for names that normalize to nothing.
/// DBF files never use a layout.
pub fn plan_file(path: &Path, layouts: &Layouts) -> Option<FilePlan> {
    if layout_table_name(path).is_some() {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let dbf = path
        .extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| extension.eq_ignore_ascii_case("dbf"));

    let competence = path
        .parent()
        .and_then(detect_competence)
        .or_else(|| detect_competence(path));

    let base = normalize_name(strip_competence_suffix(stem));
    if !dbf && layouts.contains_key(&base) {
        return Some(FilePlan {
            path: path.to_path_buf(),
            table: base,
            source: Source::FixedWidth,
            competence,
        });
    }

    let table = match &competence {
        Some(competence) if !stem.ends_with(&format!("_{competence}")) => {
            normalize_name(&format!("{stem}_{competence}"))
        }
        _ => normalize_name(stem),
    };
    if table.is_empty() {
        return None;
    }

    Some(FilePlan {
        path: path.to_path_buf(),
        table,
        source: if dbf { Source::Dbf } else { Source::Delimited },
        competence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layouts() -> Layouts {
        Layouts::from([("tb_grupo".to_string(), Vec::new())])
    }

    #[test]
    fn test_layout_files_are_not_data() {
        assert_eq!(plan_file(Path::new("/d/tb_grupo_layout.txt"), &layouts()), None);
    }

    #[test]
    fn test_fixed_width_with_layout() {
        let plan = plan_file(Path::new("/d/TabelaUnificada_202403/tb_grupo_202403.txt"), &layouts()).unwrap();
        assert_eq!(plan.table, "tb_grupo");
        assert_eq!(plan.source, Source::FixedWidth);
        assert_eq!(plan.competence.as_deref(), Some("202403"));
    }

    #[test]
    fn test_delimited_gets_competence_suffix() {
        let plan = plan_file(Path::new("/d/202401/Rl Procedimento.csv"), &layouts()).unwrap();
        assert_eq!(plan.table, "rl_procedimento_202401");
        assert_eq!(plan.source, Source::Delimited);

        let plan = plan_file(Path::new("/d/202401/tb_cid_202401.csv"), &layouts()).unwrap();
        assert_eq!(plan.table, "tb_cid_202401");

        let plan = plan_file(Path::new("/d/tb_cid.csv"), &layouts()).unwrap();
        assert_eq!(plan.table, "tb_cid");
        assert_eq!(plan.competence, None);
    }

    #[test]
    fn test_dbf_ignores_layouts() {
        let plan = plan_file(Path::new("/d/TabelaUnificada_202403/TB_GRUPO.DBF"), &layouts()).unwrap();
        assert_eq!(plan.table, "tb_grupo_202403");
        assert_eq!(plan.source, Source::Dbf);
        assert_eq!(plan.competence.as_deref(), Some("202403"));
    }

    #[test]
    fn test_parent_directory_competence_wins() {
        let plan = plan_file(Path::new("/d/202402/tb_cid_202401.csv"), &layouts()).unwrap();
        assert_eq!(plan.competence.as_deref(), Some("202402"));
        assert_eq!(plan.table, "tb_cid_202401_202402");
    }
}
