use super::{lesson_document, lesson_filename, slugify, Artifact};
use crate::error::{CourseError, Result};
use crate::jobs::CollectedCourse;
use crate::model::SyllabusMeta;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;

const FOLDER_THEME_CHARS: usize = 20;

/// `course-<slug of the first 20 characters of the theme>`
pub fn folder_name(theme: &str) -> String {
    let head: String = theme.chars().take(FOLDER_THEME_CHARS).collect();
    format!("course-{}", slugify(&head))
}

/// Gzipped tar holding one lesson document per lesson under a themed folder.
pub fn archive_artifact(syllabus: &SyllabusMeta, course: &CollectedCourse) -> Result<Artifact> {
    let mut files = Vec::with_capacity(course.lessons.len());
    for entry in course.tree.entries() {
        let body = course
            .lessons
            .get(&entry.lesson.id)
            .ok_or(CourseError::MissingContent(entry.lesson.id))?;
        files.push((
            lesson_filename(&entry.position, &entry.lesson.title),
            lesson_document(&entry.numbered_title(), body)?,
        ));
    }

    let mut bytes = Vec::new();
    write_archive(&mut bytes, &folder_name(&syllabus.theme), &files)?;
    Ok(Artifact::new(
        format!("course-complete-{}.tar.gz", slugify(&syllabus.theme)),
        bytes,
    ))
}

fn write_archive<W: Write>(writer: W, folder: &str, files: &[(String, String)]) -> Result<()> {
    let enc = GzEncoder::new(writer, Compression::default());
    let mut tar = tar::Builder::new(enc);

    for (name, content) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();

        tar.append_data(&mut header, format!("{}/{}", folder, name), content.as_bytes())
            .map_err(CourseError::Io)?;
    }

    tar.into_inner()
        .map_err(CourseError::Io)?
        .finish()
        .map_err(CourseError::Io)?;
    Ok(())
}
