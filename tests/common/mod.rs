//! Fixture projects for integration tests
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use indoc::indoc;
use tempfile::TempDir;

use laravel_navigator::config::{Project, ProjectConfig, RouteSource};
use laravel_navigator::extractors::{CommandOutput, CommandRequest, CommandRunner};
use laravel_navigator::{Navigator, Result};

/// A throwaway project directory
pub struct Fixture {
    dir: TempDir,
}

impl Fixture {
    pub fn empty() -> Self {
        Self { dir: TempDir::new().expect("create temp dir") }
    }

    /// A small but complete application: routes, templates, page components,
    /// config, translations, dotenv files and two models
    pub fn laravel_app() -> Self {
        Self::empty()
            .file("composer.json", COMPOSER)
            .file("routes/web.php", WEB_ROUTES)
            .file("routes/api.php", API_ROUTES)
            .file("app/Http/Controllers/HomeController.php", HOME_CONTROLLER)
            .file("app/Http/Controllers/BillingController.php", BILLING_CONTROLLER)
            .file("resources/views/welcome.blade.php", "<h1>Welcome</h1>\n")
            .file("resources/views/admin/users/index.blade.php", "@extends('layouts.app')\n")
            .file("resources/views/layouts/app.blade.php", "@yield('content')\n")
            .file("resources/js/Pages/Dashboard.vue", "<template></template>\n")
            .file("resources/js/Pages/Settings/Profile.tsx", "export default function Profile() {}\n")
            .file("config/app.php", APP_CONFIG)
            .file("config/database.php", DATABASE_CONFIG)
            .file("lang/en/auth.php", EN_AUTH)
            .file("lang/fr/auth.php", FR_AUTH)
            .file("lang/en.json", EN_JSON)
            .file(".env", DOTENV)
            .file(".env.example", DOTENV_EXAMPLE)
            .file("app/Models/User.php", USER_MODEL)
            .file("app/Models/Post.php", POST_MODEL)
    }

    /// Write `contents` to the root-relative `path`, creating directories
    pub fn file(self, path: &str, contents: &str) -> Self {
        self.write(path, contents);
        self
    }

    pub fn write(&self, path: &str, contents: &str) {
        let path = self.path(path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create fixture directory");
        }
        fs::write(&path, contents).expect("write fixture file");
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    /// A project over the fixture with routes read from the route files
    pub fn project(&self) -> Project {
        self.project_with(|config| config.route_source = RouteSource::Static)
    }

    pub fn project_with(&self, configure: impl FnOnce(&mut ProjectConfig)) -> Project {
        let mut config = ProjectConfig::default();
        configure(&mut config);
        Project::new(self.root(), config)
    }

    pub fn navigator(&self) -> Navigator {
        Navigator::new(self.project())
    }
}

/// Serves canned output for every command and records the requests
pub struct FakeRunner {
    output: Result<CommandOutput>,
    calls: AtomicUsize,
    last: Mutex<Option<CommandRequest>>,
}

impl FakeRunner {
    pub fn succeeding(stdout: &str) -> Self {
        Self::with_result(Ok(CommandOutput { success: true, code: Some(0), stdout: stdout.to_string(), ..Default::default() }))
    }

    pub fn with_result(output: Result<CommandOutput>) -> Self {
        Self { output, calls: AtomicUsize::new(0), last: Mutex::new(None) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<CommandRequest> {
        self.last.lock().expect("runner lock").clone()
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, request: &CommandRequest) -> Result<CommandOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().expect("runner lock") = Some(request.clone());
        match &self.output {
            Ok(output) => Ok(output.clone()),
            Err(e) => Err(laravel_navigator::NavigatorError::ExternalQueryFailed { reason: e.to_string() }),
        }
    }
}

pub const COMPOSER: &str = indoc! {r#"
    {
        "name": "laravel/laravel",
        "autoload": {
            "psr-4": {
                "App\\": "app/",
                "Database\\Factories\\": "database/factories/"
            }
        }
    }
"#};

pub const WEB_ROUTES: &str = indoc! {r#"
    <?php

    use App\Http\Controllers\HomeController;
    use Illuminate\Support\Facades\Route;

    Route::get('/', [HomeController::class, 'index'])->name('home');
    Route::get('/dashboard', fn () => inertia('Dashboard'))->name("dashboard");
    Route::resource('photos', PhotoController::class);

    Route::prefix('admin')->name('admin.')->group(function () {
        Route::get('/users', [UserController::class, 'index'])->name('admin.users.index');
    });
"#};

pub const API_ROUTES: &str = indoc! {r#"
    <?php

    Route::get('/user', fn () => auth()->user())->name('api.user');
"#};

pub const HOME_CONTROLLER: &str = indoc! {r#"
    <?php

    namespace App\Http\Controllers;

    class HomeController extends Controller
    {
        public function index()
        {
            return view('welcome');
        }
    }
"#};

pub const BILLING_CONTROLLER: &str = indoc! {r#"
    <?php

    namespace App\Http\Controllers;

    class BillingController extends Controller
    {
        public function __invoke()
        {
            return view('billing');
        }
    }
"#};

pub const APP_CONFIG: &str = indoc! {r#"
    <?php

    return [
        'name' => env('APP_NAME', 'Laravel'),
        'debug' => (bool) env('APP_DEBUG', false),
        'timezone' => 'UTC',
    ];
"#};

pub const DATABASE_CONFIG: &str = indoc! {r#"
    <?php

    return [
        'default' => env('DB_CONNECTION', 'mysql'),

        'connections' => [
            'mysql' => [
                'host' => env('DB_HOST', '127.0.0.1'),
                'port' => env('DB_PORT', '3306'),
            ],
        ],
    ];
"#};

pub const EN_AUTH: &str = indoc! {r#"
    <?php

    return [
        'failed' => 'These credentials do not match our records.',
        'throttle' => 'Too many login attempts.',
    ];
"#};

pub const FR_AUTH: &str = indoc! {r#"
    <?php

    return [
        'failed' => 'Ces identifiants ne correspondent pas à nos enregistrements.',
    ];
"#};

pub const EN_JSON: &str = indoc! {r#"
    {
        "Welcome back": "Welcome back",
        "Log out": "Log out"
    }
"#};

pub const DOTENV: &str = indoc! {"
    APP_NAME=Laravel
    APP_DEBUG=true
    DB_HOST=127.0.0.1
"};

pub const DOTENV_EXAMPLE: &str = indoc! {"
    APP_NAME=
    MAIL_HOST=smtp.example.com
"};

pub const USER_MODEL: &str = indoc! {r#"
    <?php

    namespace App\Models;

    class User extends Authenticatable
    {
        public function posts()
        {
            return $this->hasMany(Post::class);
        }

        public function roles()
        {
            return $this->belongsToMany(
                Role::class
            );
        }

        public static function admins()
        {
            return static::where('admin', true);
        }
    }
"#};

pub const POST_MODEL: &str = indoc! {r#"
    <?php

    namespace App\Models;

    class Post extends Model
    {
        public function user()
        {
            return $this->belongsTo(User::class);
        }
    }
"#};
