use actix_web::{HttpResponse, Responder, get, http::header::ContentType, web};
use byteorder::{LittleEndian, WriteBytesExt};
use serde::Deserialize;

use crate::app_state::AppState;
use crate::handlers::{blocking, error_response};
use crate::layout::{MAX_RAW_TIME, time_index};
use crate::query::{ShellMesh, ShellMeshJson};

#[derive(Deserialize)]
pub struct ShellQuery {
    pub control: usize,
    pub secondary: usize,
    #[serde(default)]
    pub run: usize,
    /// 原始时间步，默认最后一个 (1996000)
    pub time: Option<usize>,
}

impl ShellQuery {
    fn time(&self) -> usize {
        self.time.unwrap_or(MAX_RAW_TIME)
    }
}

async fn query_mesh(data: &AppState, query: &ShellQuery) -> crate::error::Result<ShellMesh> {
    let sweep = data.query.clone();
    let (control, secondary, run, time) = (query.control, query.secondary, query.run, query.time());
    blocking(move || sweep.shell(control, secondary, run, time)).await
}

/// 外壳顶点坐标与三角面片
/// 例如: /shell?control=0&secondary=0&run=1&time=996000
#[get("/shell")]
pub async fn get_shell(data: web::Data<AppState>, query: web::Query<ShellQuery>) -> impl Responder {
    match query_mesh(&data, &query).await {
        Ok(mesh) => HttpResponse::Ok().json(serde_json::json!({
            "control": query.control,
            "secondary": query.secondary,
            "run": query.run,
            "time": query.time(),
            "mesh": ShellMeshJson::from(&mesh),
        })),
        Err(err) => error_response("查询外壳数据失败", &err),
    }
}

/// 外壳顶点坐标的二进制形式（小端 f32，按 x, y, z 交错）
/// 三角面片另由 X-Triangles 头给出数量，数据本身在坐标之后以小端 u32 追加
#[get("/shell/points")]
pub async fn get_shell_points(
    data: web::Data<AppState>,
    query: web::Query<ShellQuery>,
) -> impl Responder {
    let mesh = match query_mesh(&data, &query).await {
        Ok(mesh) => mesh,
        Err(err) => return error_response("查询外壳数据失败", &err),
    };
    // shell 查询已经校验过时间
    let t = time_index(query.time()).unwrap_or_default();

    let mut bytes = Vec::with_capacity(
        mesh.points.len() * std::mem::size_of::<f32>()
            + mesh.triangles.len() * 3 * std::mem::size_of::<u32>(),
    );
    let written: std::io::Result<()> = mesh
        .points
        .iter()
        .try_for_each(|v| bytes.write_f32::<LittleEndian>(*v))
        .and_then(|_| {
            mesh.triangles
                .iter()
                .flatten()
                .try_for_each(|&i| bytes.write_u32::<LittleEndian>(i as u32))
        });
    if let Err(e) = written {
        return HttpResponse::InternalServerError().json(serde_json::json!({
            "error": "写入外壳数据失败",
            "details": e.to_string(),
        }));
    }

    HttpResponse::Ok()
        .content_type(ContentType::octet_stream())
        .append_header(("X-Vertices", mesh.points.nrows().to_string()))
        .append_header(("X-Triangles", mesh.triangles.len().to_string()))
        .append_header(("X-Timestep", t.to_string()))
        .append_header(("X-Run", query.run.to_string()))
        .body(bytes)
}
