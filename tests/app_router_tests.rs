use route_atlas::{AppRouterParser, HttpMethod, ParserOptions, Project, RouteKind};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent");
    }
    fs::write(path, content).expect("write fixture");
}

fn workspace() -> TempDir {
    let temp = TempDir::new().expect("tempdir");
    write(temp.path(), "tsconfig.json", "{}");
    temp
}

#[tokio::test]
async fn static_route_yields_single_get() {
    let temp = workspace();
    write(
        temp.path(),
        "app/api/health/route.ts",
        "export function GET() { return new Response() }\n",
    );

    let mut parser = AppRouterParser::new(ParserOptions::default());
    let routes = parser.parse(temp.path()).await.expect("parse");

    assert_eq!(routes.len(), 1);
    let route = &routes[0];
    assert_eq!(route.method, HttpMethod::Get);
    assert_eq!(route.path, "/api/health");
    assert_eq!(route.kind, RouteKind::NextJsApp);
    assert_eq!(route.name, "GET /api/health");
    assert!(route.headers.is_none());
    assert!(route.query.is_none());
    assert!(route.body.is_none());
    assert!(route.file_path.ends_with("app/api/health/route.ts"));
    assert!(route.file_path.is_absolute());
}

#[tokio::test]
async fn dynamic_route_with_schema_body() {
    let temp = workspace();
    write(
        temp.path(),
        "app/api/users/[id]/route.ts",
        r#"
import { z } from "zod";

const schema = z.object({ name: z.string(), age: z.number().optional() });

export async function POST(req: Request) {
  const data = schema.parse(await req.json());
  return Response.json(data);
}
"#,
    );

    let mut parser = AppRouterParser::new(ParserOptions::default());
    let routes = parser.parse(temp.path()).await.expect("parse");

    assert_eq!(routes.len(), 1);
    let route = &routes[0];
    assert_eq!(route.method, HttpMethod::Post);
    assert_eq!(route.path, "/api/users/:id");
    assert_eq!(route.body.as_deref(), Some(r#"{"name":"string","age":0}"#));
    let headers = route.headers.as_ref().expect("headers");
    assert_eq!(
        headers.get("Content-Type").and_then(|v| v.as_str()),
        Some("application/json")
    );
}

#[tokio::test]
async fn arrow_handlers_and_multiple_verbs() {
    let temp = workspace();
    write(
        temp.path(),
        "app/api/items/route.ts",
        r#"
export const GET = async () => new Response();
export const DELETE = () => new Response();
"#,
    );

    let mut parser = AppRouterParser::new(ParserOptions::default());
    let routes = parser.parse(temp.path()).await.expect("parse");

    let methods: Vec<HttpMethod> = routes.iter().map(|r| r.method).collect();
    assert_eq!(methods, vec![HttpMethod::Get, HttpMethod::Delete]);
    assert!(routes.iter().all(|r| r.path == "/api/items"));
    // DELETE conventionally carries no body.
    assert!(routes.iter().all(|r| r.body.is_none()));
}

#[tokio::test]
async fn methods_array_export_declares_handlers() {
    let temp = workspace();
    write(
        temp.path(),
        "app/api/batch/route.ts",
        r#"
export const methods = ["GET", "POST"];
export default function handle() {}
"#,
    );

    let mut parser = AppRouterParser::new(ParserOptions::default());
    let routes = parser.parse(temp.path()).await.expect("parse");

    let methods: Vec<HttpMethod> = routes.iter().map(|r| r.method).collect();
    assert_eq!(methods, vec![HttpMethod::Get, HttpMethod::Post]);
}

#[tokio::test]
async fn methods_array_handlers_infer_from_the_whole_file() {
    let temp = workspace();
    write(
        temp.path(),
        "app/api/notes/route.ts",
        r#"
import { z } from "zod";

const schema = z.object({ note: z.string() });

export const methods = ["GET", "POST"];

export default async function handle(req: Request) {
  const url = new URL(req.url);
  const page = url.searchParams.get("page");
  const data = schema.parse(await req.json());
  return Response.json({ page, data });
}
"#,
    );

    let mut parser = AppRouterParser::new(ParserOptions::default());
    let routes = parser.parse(temp.path()).await.expect("parse");

    assert_eq!(routes.len(), 2);
    let get = routes.iter().find(|r| r.method == HttpMethod::Get).unwrap();
    let query = get.query.as_ref().expect("query params");
    assert!(query.contains_key("page"));
    assert!(get.body.is_none());

    let post = routes.iter().find(|r| r.method == HttpMethod::Post).unwrap();
    assert_eq!(post.body.as_deref(), Some(r#"{"note":"string"}"#));
}

#[tokio::test]
async fn re_exported_handlers_resolve_to_their_declarations() {
    let temp = workspace();
    write(
        temp.path(),
        "app/api/posts/route.ts",
        r#"
import { z } from "zod";

const payload = z.object({ title: z.string() });

async function POST(req: Request) {
  const body = payload.parse(await req.json());
  return Response.json(body);
}

export { POST };
"#,
    );

    let mut parser = AppRouterParser::new(ParserOptions::default());
    let routes = parser.parse(temp.path()).await.expect("parse");

    assert_eq!(routes.len(), 1);
    let route = &routes[0];
    assert_eq!(route.method, HttpMethod::Post);
    assert_eq!(route.path, "/api/posts");
    assert_eq!(route.body.as_deref(), Some(r#"{"title":"string"}"#));
}

#[tokio::test]
async fn route_groups_and_adapters_are_skipped() {
    let temp = workspace();
    write(
        temp.path(),
        "app/(marketing)/api/promo/route.ts",
        "export function GET() {}\n",
    );
    write(
        temp.path(),
        "app/api/trpc/[trpc]/route.ts",
        r#"
import { fetchRequestHandler } from "@trpc/server/adapters/fetch";
export const GET = (req: Request) => fetchRequestHandler({ req });
"#,
    );

    let mut parser = AppRouterParser::new(ParserOptions::default());
    let routes = parser.parse(temp.path()).await.expect("parse");
    assert!(routes.is_empty());
}

#[tokio::test]
async fn src_prefix_is_stripped() {
    let temp = workspace();
    write(
        temp.path(),
        "src/app/api/ping/route.ts",
        "export function HEAD() {}\n",
    );

    let mut parser = AppRouterParser::new(ParserOptions::default());
    let routes = parser.parse(temp.path()).await.expect("parse");
    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0].path, "/api/ping");
}

#[tokio::test]
async fn missing_tsconfig_disables_parsing() {
    let temp = TempDir::new().expect("tempdir");
    write(
        temp.path(),
        "app/api/health/route.ts",
        "export function GET() {}\n",
    );

    let mut parser = AppRouterParser::new(ParserOptions::default());
    let routes = parser.parse(temp.path()).await.expect("parse");
    assert!(routes.is_empty());
}

#[tokio::test]
async fn nonexistent_root_is_an_error() {
    let mut parser = AppRouterParser::new(ParserOptions::default());
    let result = parser.parse(Path::new("/definitely/not/a/workspace")).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn handler_records_carry_internal_flags() {
    let temp = workspace();
    write(temp.path(), "app/actions/route.ts", "\"use server\";\nexport const middleware = () => {};\nexport async function POST(req: Request) {\n  try {\n    const body = await req.json();\n    await db.insert(body);\n  } catch (err) {\n    return new Response(null, { status: 500 });\n  }\n}\n");

    let options = ParserOptions::default();
    let project = Project::load(
        temp.path(),
        &[
            "**/app/**/route.ts".to_string(),
            "**/app/**/route.js".to_string(),
        ],
        &options,
    )
    .await
    .expect("load");

    let mut parser = AppRouterParser::new(options);
    let records = parser.parse_handler_records(&project);

    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.method, HttpMethod::Post);
    assert_eq!(record.route_path, "/actions");
    assert!(record.is_server_action);
    assert!(record.has_middleware);
    assert!(record.has_error_handling);
    assert!(record.uses_db);
    assert!(!record.has_validation);
    assert!(!record.is_dynamic);
    assert!(record.handler_lines > 1);
}

#[tokio::test]
async fn catch_all_segments_convert() {
    let temp = workspace();
    write(
        temp.path(),
        "app/api/files/[...path]/route.ts",
        "export function GET() {}\n",
    );
    write(
        temp.path(),
        "app/api/docs/[[...slug]]/route.ts",
        "export function GET() {}\n",
    );

    let mut parser = AppRouterParser::new(ParserOptions::default());
    let routes = parser.parse(temp.path()).await.expect("parse");

    let paths: Vec<&str> = routes.iter().map(|r| r.path.as_str()).collect();
    assert!(paths.contains(&"/api/files/:path*"));
    assert!(paths.contains(&"/api/docs/:slug?"));
}

#[tokio::test]
async fn repeated_parses_are_deterministic() {
    let temp = workspace();
    write(
        temp.path(),
        "app/api/a/route.ts",
        "export function GET() {}\nexport function POST() {}\n",
    );
    write(temp.path(), "app/api/b/[id]/route.ts", "export function PUT() {}\n");

    let mut parser = AppRouterParser::new(ParserOptions::default());
    let first = parser.parse(temp.path()).await.expect("first");
    let second = parser.parse(temp.path()).await.expect("second");

    let first_json = serde_json::to_string(&first).expect("json");
    let second_json = serde_json::to_string(&second).expect("json");
    assert_eq!(first_json, second_json);
}
