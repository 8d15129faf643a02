mod ffmpeg_command;
mod ffprobe_info;
mod path_validator;

pub use ffmpeg_command::{FfmpegCommand, SEEK_MARGIN};
pub use ffprobe_info::{MediaInfo, get_media_info, parse_probe_output};
pub use path_validator::{ensure_directory_exists, validate_file_exists};
