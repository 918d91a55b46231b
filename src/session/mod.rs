pub(crate) mod scene_host;
