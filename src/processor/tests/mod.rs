//! Integration tests for the processor module
//!
//! Tests the complete pipeline against generated AGS deliveries.


use std::fs;
use std::path::{Path, PathBuf};

/// One borehole row of a generated AGS3 file
pub struct Hole<'a> {
    pub id: &'a str,
    pub easting: &'a str,
    pub northing: &'a str,
    pub ground_level: &'a str,
    pub final_depth: &'a str,
}

impl<'a> Hole<'a> {
    pub fn new(id: &'a str, easting: &'a str, northing: &'a str) -> Self {
        Self {
            id,
            easting,
            northing,
            ground_level: "5.00",
            final_depth: "20.00",
        }
    }
}

/// Build an AGS3 file with PROJ, HOLE, GEOL and optionally ISPT groups
pub fn ags3_text(project_id: &str, holes: &[Hole], with_spt: bool) -> String {
    let mut text = String::new();
    text.push_str("\"**PROJ\"\r\n\"*PROJ_ID\",\"*PROJ_NAME\"\r\n\"<UNITS>\",\"\"\r\n");
    text.push_str(&format!("\"{}\",\"Test project\"\r\n\r\n", project_id));

    text.push_str("\"**HOLE\"\r\n");
    text.push_str("\"*HOLE_ID\",\"*HOLE_TYPE\",\"*HOLE_NATE\",\"*HOLE_NATN\",\"*HOLE_GL\",\"*HOLE_FDEP\",\"*HOLE_STAR\",\"*HOLE_ENDD\",\"*HOLE_REM\"\r\n");
    text.push_str("\"<UNITS>\",\"\",\"m\",\"m\",\"m\",\"m\",\"dd/mm/yyyy\",\"dd/mm/yyyy\",\"\"\r\n");
    for hole in holes {
        text.push_str(&format!(
            "\"{}\",\"CP\",\"{}\",\"{}\",\"{}\",\"{}\",\"01/02/2020\",\"03/02/2020\",\"\"\r\n",
            hole.id, hole.easting, hole.northing, hole.ground_level, hole.final_depth
        ));
    }
    text.push_str("\r\n");

    text.push_str("\"**GEOL\"\r\n");
    text.push_str("\"*HOLE_ID\",\"*GEOL_TOP\",\"*GEOL_BASE\",\"*GEOL_DESC\",\"*GEOL_LEG\"\r\n");
    text.push_str("\"<UNITS>\",\"m\",\"m\",\"\",\"\"\r\n");
    for hole in holes {
        text.push_str(&format!(
            "\"{}\",\"0.00\",\"2.50\",\"Made ground\",\"FILL\"\r\n",
            hole.id
        ));
        text.push_str(&format!(
            "\"{}\",\"2.50\",\"{}\",\"Completely decomposed granite\",\"CDG\"\r\n",
            hole.id, hole.final_depth
        ));
    }

    if with_spt {
        text.push_str("\r\n\"**ISPT\"\r\n\"*HOLE_ID\",\"*ISPT_TOP\",\"*ISPT_NVAL\"\r\n");
        text.push_str("\"<UNITS>\",\"m\",\"\"\r\n");
        for hole in holes {
            text.push_str(&format!("\"{}\",\"3.00\",\"25\"\r\n", hole.id));
        }
    }

    text
}

pub fn write_ags(dir: &Path, name: &str, text: &str) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, text).unwrap();
    path
}

pub fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}
