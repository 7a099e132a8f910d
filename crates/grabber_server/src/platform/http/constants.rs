pub const ROUTE_STATUS: &str = "/api/status";
pub const ROUTE_PROCESS: &str = "/api/process";
pub const ROUTE_DOWNLOAD: &str = "/api/download/:download_id";
pub const ROUTE_QUEUE: &str = "/api/queue";
pub const ROUTE_QUEUE_CLEAR: &str = "/api/queue/clear";
pub const ROUTE_SOCKET: &str = "/ws";

pub const STATUS_RUNNING: &str = "Server is running";
pub const MSG_DOWNLOAD_OK: &str = "File downloaded successfully";
pub const MSG_NO_LINKS: &str = "No links provided";
pub const MSG_CONFIRM_CLEAR: &str = "A download run is active; confirm to clear the queue";
pub const MSG_QUEUE_CLEARED: &str = "Download queue cleared";
pub const MSG_ORIGIN_REJECTED: &str =
    "The CORS policy for this site does not allow access from the specified origin.";
pub const MSG_SOCKET_GREETING: &str = "Connected to FitGirl Downloader server";

pub const ALLOWED_METHODS: &str = "GET, POST, OPTIONS";
